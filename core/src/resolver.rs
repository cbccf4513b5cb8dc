//! Forward and reverse lookups against one recursive nameserver.
//!
//! All lookups share one UDP socket. Replies are matched back to their query
//! by `(nameserver address, transaction id)` through the pending table, so
//! any number of lookups can be in flight at once.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use recon_common::error::StartupError;
use recon_common::models::{LookupError, RecordType, ResolutionRecord};
use recon_common::network::target::Target;
use recon_common::utils::ip;
use recon_protocols::dns::{self, DnsReply, Rcode};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::context::NetworkContext;
use crate::demux::{Pending, PendingTable};

const MAX_DATAGRAM: usize = 4096;
const MAX_ID_ATTEMPTS: usize = 16;

type QueryKey = (SocketAddr, u16);
type ReplyTable = PendingTable<QueryKey, RecordType, Result<DnsReply, String>>;

pub struct DnsResolver {
    socket: Arc<UdpSocket>,
    nameserver: SocketAddr,
    pending: Arc<ReplyTable>,
    id_counter: AtomicU16,
    receiver: JoinHandle<()>,
}

impl DnsResolver {
    /// Binds the shared socket and starts its receive loop.
    pub async fn bind(nameserver: SocketAddr) -> Result<Self, StartupError> {
        let bind_addr: SocketAddr = match nameserver {
            SocketAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            SocketAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
        };
        let socket: Arc<UdpSocket> = Arc::new(UdpSocket::bind(bind_addr).await?);
        let pending: Arc<ReplyTable> = Arc::new(PendingTable::new());
        let receiver = tokio::spawn(receive_loop(Arc::clone(&socket), Arc::clone(&pending)));

        debug!("Resolving through {nameserver}");
        Ok(Self {
            socket,
            nameserver,
            pending,
            id_counter: AtomicU16::new(rand::random()),
            receiver,
        })
    }

    pub fn nameserver(&self) -> SocketAddr {
        self.nameserver
    }

    /// One query, one attempt. Every outcome is folded into the record.
    pub async fn lookup(&self, name: &str, record_type: RecordType, timeout: Duration) -> ResolutionRecord {
        let Some(pending) = self.register(record_type) else {
            return ResolutionRecord::failed(name, record_type, other("no free transaction id"));
        };
        let (_, id) = *pending.key();

        let query: Vec<u8> = match dns::create_query_packet(name, record_type, id) {
            Ok(query) => query,
            Err(e) => return ResolutionRecord::failed(name, record_type, other(e)),
        };
        if let Err(e) = self.socket.send_to(&query, self.nameserver).await {
            debug!("Query for {name} not sent: {e}");
            return ResolutionRecord::failed(name, record_type, other(e));
        }

        let record = match pending.wait(timeout).await {
            None => ResolutionRecord::failed(name, record_type, LookupError::Timeout),
            Some(Err(e)) => ResolutionRecord::failed(name, record_type, LookupError::Other(e)),
            Some(Ok(reply)) => classify(name, record_type, reply),
        };
        trace!("{name} {record_type}: {:?}", record.error);
        record
    }

    fn register(
        &self,
        record_type: RecordType,
    ) -> Option<Pending<QueryKey, RecordType, Result<DnsReply, String>>> {
        (0..MAX_ID_ATTEMPTS).find_map(|_| {
            let id: u16 = self.id_counter.fetch_add(1, Ordering::Relaxed);
            self.pending.register((self.nameserver, id), record_type)
        })
    }
}

impl Drop for DnsResolver {
    fn drop(&mut self) {
        self.receiver.abort();
    }
}

async fn receive_loop(socket: Arc<UdpSocket>, pending: Arc<ReplyTable>) {
    let mut buffer = vec![0u8; MAX_DATAGRAM];
    loop {
        let (len, source) = match socket.recv_from(&mut buffer).await {
            Ok(received) => received,
            Err(e) => {
                trace!("Resolver socket read failed: {e}");
                continue;
            }
        };
        let payload: &[u8] = &buffer[..len];
        let Some(id) = dns::get_transaction_id(payload) else {
            trace!("Runt datagram from {source}");
            continue;
        };

        let matched = pending.resolve(&(source, id), |record_type| {
            Some(dns::parse_reply(payload, *record_type).map_err(|e| e.to_string()))
        });
        if !matched {
            trace!("Unsolicited reply {id} from {source}");
        }
    }
}

fn classify(name: &str, record_type: RecordType, reply: DnsReply) -> ResolutionRecord {
    if reply.truncated {
        debug!("Reply for {name} is truncated, using the records it carries");
    }
    match reply.rcode {
        Rcode::NoError => ResolutionRecord::answered(name, record_type, reply.records),
        Rcode::NxDomain => ResolutionRecord::failed(name, record_type, LookupError::NxDomain),
        Rcode::ServFail => ResolutionRecord::failed(name, record_type, LookupError::ServFail),
        rcode => ResolutionRecord::failed(name, record_type, other(rcode)),
    }
}

fn other(e: impl ToString) -> LookupError {
    LookupError::Other(e.to_string())
}

/// Resolves `name` through the context's nameserver.
pub async fn resolve(
    ctx: &NetworkContext,
    name: &str,
    record_type: RecordType,
    timeout: Duration,
) -> ResolutionRecord {
    ctx.resolver().lookup(name, record_type, timeout).await
}

/// PTR lookup for `addr`. A missing PTR is an empty record, not an error.
pub async fn reverse_resolve(ctx: &NetworkContext, addr: IpAddr, timeout: Duration) -> ResolutionRecord {
    let name: String = ip::reverse_address_to_ptr(&addr);
    let record = ctx.resolver().lookup(&name, RecordType::Ptr, timeout).await;
    match record.error {
        Some(LookupError::NxDomain) => ResolutionRecord::answered(&name, RecordType::Ptr, Vec::new()),
        _ => record,
    }
}

/// Turns a target into the addresses to probe.
///
/// Addresses pass through untouched. Names get one A lookup; a name that
/// does not resolve aborts the run.
pub async fn resolve_target(ctx: &NetworkContext, target: &Target) -> Result<Vec<IpAddr>, StartupError> {
    let name: &str = match target {
        Target::Host { target_addr } => return Ok(vec![*target_addr]),
        Target::Domain { name } => name,
    };

    let record = resolve(ctx, name, RecordType::A, ctx.config().timeout).await;
    if let Some(e) = record.error {
        return Err(StartupError::input(format!("cannot resolve {name}: {e}")));
    }
    let addrs: Vec<IpAddr> = record.addresses().collect();
    if addrs.is_empty() {
        return Err(StartupError::input(format!("{name} has no A record")));
    }
    Ok(addrs)
}
