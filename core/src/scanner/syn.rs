//! Half-open TCP probing.
//!
//! Each probe picks a fresh local port and sequence number, registers
//! `(remote addr, remote port, local port)` in the pending table and sends a
//! single SYN. The receive loop feeds every captured TCP segment and ICMP
//! unreachable through [`SynEngine::handle_inbound`], which completes the
//! matching probe. Nothing is retransmitted.

use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use pnet::packet::tcp::TcpPacket;
use recon_common::error::StartupError;
use recon_common::models::{ProbeRequest, ProbeResult, Protocol, Verdict};
use recon_protocols::icmp::{self, QuotedProbe};
use recon_protocols::tcp::{self, Segment, TcpReply};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::context::NetworkContext;
use crate::demux::{Pending, PendingTable};
use crate::network::source;
use crate::network::transport::{Inbound, SegmentSender, TransportType};
use crate::scanner;

const LOCAL_PORT_RANGE: std::ops::Range<u16> = 40_000..60_000;
const MAX_PORT_ATTEMPTS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SynKey {
    pub remote_addr: IpAddr,
    pub remote_port: u16,
    pub local_port: u16,
}

/// What came back for one probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynReply {
    Tcp(TcpReply),
    Unreachable { code: u8 },
}

type SynTable = PendingTable<SynKey, u32, SynReply>;

pub struct SynEngine {
    sender: Arc<dyn SegmentSender>,
    pending: Arc<SynTable>,
    send_rst: bool,
    local_failures: AtomicUsize,
}

impl SynEngine {
    pub fn new(sender: Arc<dyn SegmentSender>, send_rst: bool) -> Self {
        Self {
            sender,
            pending: Arc::new(PendingTable::new()),
            send_rst,
            local_failures: AtomicUsize::new(0),
        }
    }

    /// Number of probes currently waiting for a reply.
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Probes that never left this host. They are reported as filtered, the
    /// same verdict a remote ICMP unreachable gets.
    pub fn local_failures(&self) -> usize {
        self.local_failures.load(Ordering::Relaxed)
    }

    fn failed_locally(&self, request: &ProbeRequest, started: Instant) -> ProbeResult {
        self.local_failures.fetch_add(1, Ordering::Relaxed);
        ProbeResult::new(request, Verdict::Filtered, started.elapsed())
    }

    pub async fn probe(&self, target: IpAddr, port: u16, timeout: Duration) -> ProbeResult {
        let started: Instant = Instant::now();
        let sequence: u32 = rand::random();
        let request = ProbeRequest::new(target, port, Protocol::Tcp, Vec::new());

        let src_addr: IpAddr = match source::source_addr_for(target) {
            Ok(addr) => addr,
            Err(e) => {
                warn!("No route to {target}: {e}");
                return self.failed_locally(&request, started);
            }
        };

        let Some(pending) = self.register(target, port, sequence) else {
            warn!("No free local port for {target}:{port}");
            return self.failed_locally(&request, started);
        };

        let segment = Segment {
            src_addr,
            dst_addr: target,
            src_port: pending.key().local_port,
            dst_port: port,
            sequence,
            acknowledgement: 0,
        };
        let request = match tcp::create_syn_packet(&segment) {
            Ok(bytes) => ProbeRequest::new(target, port, Protocol::Tcp, bytes),
            Err(e) => {
                warn!("Cannot build SYN for {target}:{port}: {e}");
                return self.failed_locally(&request, started);
            }
        };

        if let Err(e) = self.send(&request.payload, target).await {
            warn!("SYN to {target}:{port} was not sent: {e}");
            return self.failed_locally(&request, started);
        }

        let verdict: Verdict = match pending.wait(timeout).await {
            Some(reply) => verdict_for(reply, &request),
            None => Verdict::NoResponse,
        };
        let result = ProbeResult::new(&request, verdict, started.elapsed());

        if verdict == Verdict::Open && self.send_rst {
            self.tear_down(segment).await;
        }
        trace!("{target}:{port} is {verdict} after {:?}", result.elapsed);
        result
    }

    /// Completes the probe a captured packet answers. Packets that match no
    /// outstanding probe are ignored.
    pub fn handle_inbound(&self, inbound: &Inbound) -> bool {
        match inbound.kind {
            TransportType::TcpV4 | TransportType::TcpV6 => self.handle_tcp(inbound),
            TransportType::IcmpV4 => match icmp::parse_unreachable_v4(&inbound.bytes) {
                Ok(Some(quoted)) => self.handle_unreachable(quoted),
                Ok(None) => false,
                Err(e) => {
                    trace!("Dropping ICMP from {}: {e}", inbound.source);
                    false
                }
            },
            TransportType::IcmpV6 => match icmp::parse_unreachable_v6(&inbound.bytes) {
                Ok(Some(quoted)) => self.handle_unreachable(quoted),
                Ok(None) => false,
                Err(e) => {
                    trace!("Dropping ICMPv6 from {}: {e}", inbound.source);
                    false
                }
            },
        }
    }

    fn handle_tcp(&self, inbound: &Inbound) -> bool {
        let Ok(packet) = tcp::get_packet_from_u8(&inbound.bytes) else {
            return false;
        };
        let key = SynKey {
            remote_addr: inbound.source,
            remote_port: packet.get_source(),
            local_port: packet.get_destination(),
        };
        let reply: TcpReply = tcp::classify(&packet);

        self.pending.resolve(&key, |sequence| {
            tcp::acknowledges(&packet, *sequence).then_some(SynReply::Tcp(reply))
        })
    }

    fn handle_unreachable(&self, quoted: QuotedProbe) -> bool {
        let key = SynKey {
            remote_addr: quoted.dst_addr,
            remote_port: quoted.dst_port,
            local_port: quoted.src_port,
        };
        self.pending.resolve(&key, |sequence| {
            (*sequence == quoted.sequence).then_some(SynReply::Unreachable { code: quoted.code })
        })
    }

    fn register(
        &self,
        target: IpAddr,
        port: u16,
        sequence: u32,
    ) -> Option<Pending<SynKey, u32, SynReply>> {
        (0..MAX_PORT_ATTEMPTS).find_map(|_| {
            let key = SynKey {
                remote_addr: target,
                remote_port: port,
                local_port: rand::random_range(LOCAL_PORT_RANGE),
            };
            self.pending.register(key, sequence)
        })
    }

    async fn send(&self, segment: &[u8], destination: IpAddr) -> std::io::Result<()> {
        let sender: Arc<dyn SegmentSender> = Arc::clone(&self.sender);
        let bytes: Vec<u8> = segment.to_vec();
        tokio::task::spawn_blocking(move || sender.send_segment(&bytes, destination))
            .await
            .map_err(std::io::Error::other)?
    }

    async fn tear_down(&self, syn: Segment) {
        let rst = Segment {
            sequence: syn.sequence.wrapping_add(1),
            ..syn
        };
        match tcp::create_rst_packet(&rst) {
            Ok(bytes) => {
                if let Err(e) = self.send(&bytes, syn.dst_addr).await {
                    debug!("RST to {}:{} failed: {e}", syn.dst_addr, syn.dst_port);
                }
            }
            Err(e) => debug!("Cannot build RST: {e}"),
        }
    }
}

/// Probes a single port through the context's raw channels.
pub async fn probe(
    ctx: &NetworkContext,
    addr: IpAddr,
    port: u16,
    timeout: Duration,
) -> Result<ProbeResult, StartupError> {
    scanner::validate(&[port], timeout)?;
    Ok(scanner::raw_engine(ctx)?.probe(addr, port, timeout).await)
}

fn verdict_for(reply: SynReply, request: &ProbeRequest) -> Verdict {
    match reply {
        SynReply::Tcp(TcpReply::SynAck) => Verdict::Open,
        SynReply::Tcp(TcpReply::Rst) => Verdict::Closed,
        SynReply::Tcp(TcpReply::Unexpected) => {
            debug!(
                "Ambiguous reply from {}, unexpected TCP flags, reporting filtered",
                request.socket_addr()
            );
            Verdict::Filtered
        }
        SynReply::Unreachable { code } => {
            debug!("{} unreachable (code {code})", request.socket_addr());
            Verdict::Filtered
        }
    }
}

/// Receive loop: drains the listener queue into the engine until every
/// listener is gone.
pub async fn run_demux(engine: Arc<SynEngine>, mut inbound: mpsc::UnboundedReceiver<Inbound>) {
    while let Some(packet) = inbound.recv().await {
        engine.handle_inbound(&packet);
    }
    debug!("SYN receive loop finished");
}

/// Parses a segment the engine sent. Handy for mock transports.
pub fn decode_probe(segment: &[u8]) -> Option<(u16, u16, u32)> {
    let packet = TcpPacket::new(segment)?;
    Some((
        packet.get_source(),
        packet.get_destination(),
        packet.get_sequence(),
    ))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
