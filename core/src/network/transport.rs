//! Raw layer 4 channels shared by every SYN probe.
//!
//! TCP segments go out through one raw socket per address family. Four
//! listener threads (TCP and ICMP, for IPv4 and IPv6) block on their sockets
//! and forward everything they read into a single queue, which the engine
//! drains in one receive loop.

use std::io;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use pnet::packet::Packet;
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::tcp::TcpPacket;
use pnet::transport::{
    self, TransportChannelType, TransportProtocol, TransportReceiver, TransportSender,
};
use recon_common::error::StartupError;
use tokio::sync::mpsc;
use tracing::{debug, warn};

const TRANSPORT_BUFFER_SIZE: usize = 4096;
const POLL_INTERVAL: Duration = Duration::from_millis(100);

const CHANNEL_TYPE_TCP_V4: TransportChannelType =
    TransportChannelType::Layer4(TransportProtocol::Ipv4(IpNextHeaderProtocols::Tcp));
const CHANNEL_TYPE_TCP_V6: TransportChannelType =
    TransportChannelType::Layer4(TransportProtocol::Ipv6(IpNextHeaderProtocols::Tcp));
const CHANNEL_TYPE_ICMP_V4: TransportChannelType =
    TransportChannelType::Layer4(TransportProtocol::Ipv4(IpNextHeaderProtocols::Icmp));
const CHANNEL_TYPE_ICMP_V6: TransportChannelType =
    TransportChannelType::Layer4(TransportProtocol::Ipv6(IpNextHeaderProtocols::Icmpv6));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportType {
    TcpV4,
    TcpV6,
    IcmpV4,
    IcmpV6,
}

impl TransportType {
    fn channel_type(self) -> TransportChannelType {
        match self {
            TransportType::TcpV4 => CHANNEL_TYPE_TCP_V4,
            TransportType::TcpV6 => CHANNEL_TYPE_TCP_V6,
            TransportType::IcmpV4 => CHANNEL_TYPE_ICMP_V4,
            TransportType::IcmpV6 => CHANNEL_TYPE_ICMP_V6,
        }
    }
}

/// One packet read by a listener, without its IP header.
#[derive(Debug, Clone)]
pub struct Inbound {
    pub kind: TransportType,
    pub bytes: Vec<u8>,
    pub source: IpAddr,
}

/// Transmits a ready-made TCP segment to `destination`.
pub trait SegmentSender: Send + Sync {
    fn send_segment(&self, segment: &[u8], destination: IpAddr) -> io::Result<()>;
}

/// Send halves of the raw TCP channels. Sends are serialized per family.
pub struct RawSender {
    tcp_v4: Mutex<TransportSender>,
    tcp_v6: Option<Mutex<TransportSender>>,
}

impl SegmentSender for RawSender {
    fn send_segment(&self, segment: &[u8], destination: IpAddr) -> io::Result<()> {
        let sender: &Mutex<TransportSender> = match destination {
            IpAddr::V4(_) => &self.tcp_v4,
            IpAddr::V6(_) => self.tcp_v6.as_ref().ok_or_else(|| {
                io::Error::new(io::ErrorKind::Unsupported, "IPv6 raw socket is unavailable")
            })?,
        };
        let packet = TcpPacket::new(segment).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "segment shorter than a TCP header")
        })?;
        let mut tx = sender.lock().unwrap_or_else(PoisonError::into_inner);
        tx.send_to(packet, destination)?;
        Ok(())
    }
}

/// Owns the listener threads. Dropping it tells them to stop; they notice
/// within one [`POLL_INTERVAL`] and release their sockets.
pub struct ListenerGuard {
    stop: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
}

impl ListenerGuard {
    /// Stops the listeners and waits until every socket is closed.
    pub fn join(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        for handle in std::mem::take(&mut self.threads) {
            if handle.join().is_err() {
                warn!("A packet listener panicked");
            }
        }
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

pub struct RawChannels {
    pub sender: RawSender,
    pub listeners: ListenerGuard,
    pub inbound: mpsc::UnboundedReceiver<Inbound>,
}

macro_rules! spawn_listener {
    ($kind:expr, $tx:expr, $rx:expr, $stop:expr, $iter_func:path) => {{
        let kind: TransportType = $kind;
        let tx: mpsc::UnboundedSender<Inbound> = $tx;
        let stop: Arc<AtomicBool> = $stop;
        let mut rx: TransportReceiver = $rx;
        std::thread::spawn(move || {
            let mut iterator = $iter_func(&mut rx);
            while !stop.load(Ordering::Relaxed) {
                match iterator.next_with_timeout(POLL_INTERVAL) {
                    Ok(Some((packet, source))) => {
                        let inbound = Inbound {
                            kind,
                            bytes: packet.packet().to_vec(),
                            source,
                        };
                        if tx.send(inbound).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => debug!("{kind:?} listener read failed: {e}"),
                }
            }
            debug!("{kind:?} listener stopped");
        })
    }};
}

/// Opens every raw channel the SYN prober needs.
///
/// IPv4 channels are mandatory: failing to open them is a [`StartupError`].
/// IPv6 channels are optional because many hosts run without IPv6.
pub fn start_packet_capture() -> Result<RawChannels, StartupError> {
    let (tcp_v4_tx, tcp_v4_rx) = open_channel(TransportType::TcpV4)?;
    let (_, icmp_v4_rx) = open_channel(TransportType::IcmpV4)?;
    let ipv6 = match (
        open_channel(TransportType::TcpV6),
        open_channel(TransportType::IcmpV6),
    ) {
        (Ok(tcp), Ok(icmp)) => Some((tcp, icmp)),
        (Err(e), _) | (_, Err(e)) => {
            warn!("IPv6 probing disabled: {e}");
            None
        }
    };

    let stop: Arc<AtomicBool> = Arc::new(AtomicBool::new(false));
    let (queue_tx, queue_rx) = mpsc::unbounded_channel();
    let mut threads: Vec<JoinHandle<()>> = vec![
        spawn_listener!(
            TransportType::TcpV4,
            queue_tx.clone(),
            tcp_v4_rx,
            stop.clone(),
            transport::tcp_packet_iter
        ),
        spawn_listener!(
            TransportType::IcmpV4,
            queue_tx.clone(),
            icmp_v4_rx,
            stop.clone(),
            transport::icmp_packet_iter
        ),
    ];

    let tcp_v6_tx = match ipv6 {
        Some(((tcp_v6_tx, tcp_v6_rx), (_, icmp_v6_rx))) => {
            threads.push(spawn_listener!(
                TransportType::TcpV6,
                queue_tx.clone(),
                tcp_v6_rx,
                stop.clone(),
                transport::tcp_packet_iter
            ));
            threads.push(spawn_listener!(
                TransportType::IcmpV6,
                queue_tx.clone(),
                icmp_v6_rx,
                stop.clone(),
                transport::icmpv6_packet_iter
            ));
            Some(Mutex::new(tcp_v6_tx))
        }
        None => None,
    };

    Ok(RawChannels {
        sender: RawSender {
            tcp_v4: Mutex::new(tcp_v4_tx),
            tcp_v6: tcp_v6_tx,
        },
        listeners: ListenerGuard { stop, threads },
        inbound: queue_rx,
    })
}

fn open_channel(
    transport_type: TransportType,
) -> Result<(TransportSender, TransportReceiver), StartupError> {
    transport::transport_channel(TRANSPORT_BUFFER_SIZE, transport_type.channel_type())
        .map_err(channel_error)
}

/// A refused raw socket is a privilege problem; anything else is plain I/O.
pub fn channel_error(e: io::Error) -> StartupError {
    match e.kind() {
        io::ErrorKind::PermissionDenied => StartupError::Privilege(privilege_hint(&e)),
        _ => StartupError::Io(e),
    }
}

fn privilege_hint(e: &io::Error) -> String {
    if is_root::is_root() {
        format!("{e} (running as root, is a security module blocking raw sockets?)")
    } else {
        format!("{e} (run as root or grant CAP_NET_RAW)")
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
