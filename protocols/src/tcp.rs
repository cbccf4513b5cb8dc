//! TCP segments for half-open probing.
//!
//! Segments are built without an IP header. The kernel adds it when the
//! segment goes out through a layer 4 raw channel, so only the pseudo header
//! checksum has to be computed here.

use std::net::IpAddr;

use anyhow::{Context, bail};
use pnet::packet::tcp::{self, MutableTcpPacket, TcpFlags, TcpPacket};

pub const TCP_HDR_LEN: usize = 20;
const PROBE_WINDOW: u16 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Syn,
    SynAck,
    Rst,
    RstAck,
    Ack,
}

/// Addressing and numbering of one segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub src_addr: IpAddr,
    pub dst_addr: IpAddr,
    pub src_port: u16,
    pub dst_port: u16,
    pub sequence: u32,
    pub acknowledgement: u32,
}

/// What a reply to a SYN says about the port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcpReply {
    SynAck,
    Rst,
    /// Flags that answer neither way (e.g. a bare ACK).
    Unexpected,
}

pub fn create_syn_packet(segment: &Segment) -> anyhow::Result<Vec<u8>> {
    create_packet(segment, SegmentKind::Syn)
}

pub fn create_rst_packet(segment: &Segment) -> anyhow::Result<Vec<u8>> {
    create_packet(segment, SegmentKind::Rst)
}

pub fn create_packet(segment: &Segment, kind: SegmentKind) -> anyhow::Result<Vec<u8>> {
    let mut buffer: Vec<u8> = vec![0u8; TCP_HDR_LEN];
    {
        let mut tcp: MutableTcpPacket =
            MutableTcpPacket::new(&mut buffer).context("creating tcp packet")?;
        tcp.set_source(segment.src_port);
        tcp.set_destination(segment.dst_port);
        tcp.set_sequence(segment.sequence);
        tcp.set_acknowledgement(segment.acknowledgement);
        tcp.set_data_offset((TCP_HDR_LEN / 4) as u8);
        match kind {
            SegmentKind::Syn => tcp.set_flags(TcpFlags::SYN),
            SegmentKind::SynAck => tcp.set_flags(TcpFlags::SYN | TcpFlags::ACK),
            SegmentKind::Rst => tcp.set_flags(TcpFlags::RST),
            SegmentKind::RstAck => tcp.set_flags(TcpFlags::RST | TcpFlags::ACK),
            SegmentKind::Ack => tcp.set_flags(TcpFlags::ACK),
        }
        let window: u16 = if kind == SegmentKind::Syn { PROBE_WINDOW } else { 0 };
        tcp.set_window(window);
        tcp.set_urgent_ptr(0);

        tcp.set_checksum(0);
        let csm: u16 = checksum(&tcp.to_immutable(), segment)?;
        tcp.set_checksum(csm);
    }
    Ok(buffer)
}

fn checksum(packet: &TcpPacket, segment: &Segment) -> anyhow::Result<u16> {
    match (segment.src_addr, segment.dst_addr) {
        (IpAddr::V4(src), IpAddr::V4(dst)) => Ok(tcp::ipv4_checksum(packet, &src, &dst)),
        (IpAddr::V6(src), IpAddr::V6(dst)) => Ok(tcp::ipv6_checksum(packet, &src, &dst)),
        (src, dst) => bail!("address family mismatch between {src} and {dst}"),
    }
}

pub fn get_packet_from_u8(bytes: &[u8]) -> anyhow::Result<TcpPacket<'_>> {
    TcpPacket::new(bytes).context("truncated or invalid TCP packet")
}

/// Classifies a reply by its flags alone.
///
/// SYN+ACK wins over everything else. RST counts only when SYN is absent.
pub fn classify(packet: &TcpPacket) -> TcpReply {
    let flags = packet.get_flags();
    let syn_ack = TcpFlags::SYN | TcpFlags::ACK;

    if flags & syn_ack == syn_ack {
        TcpReply::SynAck
    } else if flags & TcpFlags::RST != 0 && flags & TcpFlags::SYN == 0 {
        TcpReply::Rst
    } else {
        TcpReply::Unexpected
    }
}

/// True unless the reply carries an ACK for something other than `sequence + 1`.
pub fn acknowledges(packet: &TcpPacket, sequence: u32) -> bool {
    if packet.get_flags() & TcpFlags::ACK == 0 {
        return true;
    }
    packet.get_acknowledgement() == sequence.wrapping_add(1)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
