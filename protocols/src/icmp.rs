//! Destination-unreachable messages that quote one of our SYN probes.
//!
//! Routers and hosts put the offending IP header and at least the first
//! 8 bytes of its payload behind the 4 unused bytes of the ICMP header. Those
//! 8 bytes hold the TCP ports and sequence number, which is all we need to find
//! the probe the message refers to.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use anyhow::{Context, ensure};
use pnet::packet::Packet;
use pnet::packet::icmp::{IcmpPacket, IcmpTypes};
use pnet::packet::icmpv6::{Icmpv6Packet, Icmpv6Types};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::ipv6::Ipv6Packet;

const UNUSED_LEN: usize = 4;
const IPV6_HDR_LEN: usize = 40;
const QUOTED_TCP_LEN: usize = 8;

/// The probe an unreachable message refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotedProbe {
    pub dst_addr: IpAddr,
    pub src_port: u16,
    pub dst_port: u16,
    pub sequence: u32,
    pub code: u8,
}

/// Parses an ICMPv4 message. `Ok(None)` for anything but a destination
/// unreachable that quotes a TCP segment.
pub fn parse_unreachable_v4(bytes: &[u8]) -> anyhow::Result<Option<QuotedProbe>> {
    let icmp = IcmpPacket::new(bytes).context("truncated or invalid ICMP packet")?;
    if icmp.get_icmp_type() != IcmpTypes::DestinationUnreachable {
        return Ok(None);
    }

    let quote: &[u8] = strip_unused(icmp.payload())?;
    let ip = Ipv4Packet::new(quote).context("quoted IPv4 header is truncated")?;
    if ip.get_next_level_protocol() != IpNextHeaderProtocols::Tcp {
        return Ok(None);
    }

    let header_len: usize = ip.get_header_length() as usize * 4;
    ensure!(quote.len() >= header_len, "quoted IPv4 header is truncated");

    let dst_addr: IpAddr = IpAddr::V4(ip.get_destination());
    let probe = parse_quoted_tcp(&quote[header_len..], dst_addr, icmp.get_icmp_code().0)?;
    Ok(Some(probe))
}

/// Parses an ICMPv6 message. Same contract as [`parse_unreachable_v4`].
pub fn parse_unreachable_v6(bytes: &[u8]) -> anyhow::Result<Option<QuotedProbe>> {
    let icmp = Icmpv6Packet::new(bytes).context("truncated or invalid ICMPv6 packet")?;
    if icmp.get_icmpv6_type() != Icmpv6Types::DestinationUnreachable {
        return Ok(None);
    }

    let quote: &[u8] = strip_unused(icmp.payload())?;
    let ip = Ipv6Packet::new(quote).context("quoted IPv6 header is truncated")?;
    if ip.get_next_header() != IpNextHeaderProtocols::Tcp {
        return Ok(None);
    }

    let dst_addr: IpAddr = IpAddr::V6(ip.get_destination());
    let probe = parse_quoted_tcp(&quote[IPV6_HDR_LEN..], dst_addr, icmp.get_icmpv6_code().0)?;
    Ok(Some(probe))
}

fn strip_unused(payload: &[u8]) -> anyhow::Result<&[u8]> {
    payload
        .get(UNUSED_LEN..)
        .context("ICMP message carries no quote")
}

fn parse_quoted_tcp(tcp: &[u8], dst_addr: IpAddr, code: u8) -> anyhow::Result<QuotedProbe> {
    ensure!(
        tcp.len() >= QUOTED_TCP_LEN,
        "quoted TCP header is truncated ({} bytes)",
        tcp.len()
    );
    Ok(QuotedProbe {
        dst_addr,
        src_port: u16::from_be_bytes([tcp[0], tcp[1]]),
        dst_port: u16::from_be_bytes([tcp[2], tcp[3]]),
        sequence: u32::from_be_bytes([tcp[4], tcp[5], tcp[6], tcp[7]]),
        code,
    })
}

/// Builds a destination-unreachable message quoting a TCP segment.
///
/// Used to exercise the reply path without a network.
pub fn create_unreachable_v4(
    src_addr: Ipv4Addr,
    dst_addr: Ipv4Addr,
    code: u8,
    tcp_segment: &[u8],
) -> Vec<u8> {
    let mut ip_header: [u8; 20] = [0u8; 20];
    ip_header[0] = 0x45;
    ip_header[2..4].copy_from_slice(&((20 + tcp_segment.len()) as u16).to_be_bytes());
    ip_header[8] = 64;
    ip_header[9] = IpNextHeaderProtocols::Tcp.0;
    ip_header[12..16].copy_from_slice(&src_addr.octets());
    ip_header[16..20].copy_from_slice(&dst_addr.octets());

    let quoted_len: usize = tcp_segment.len().min(QUOTED_TCP_LEN);
    let mut message: Vec<u8> = vec![IcmpTypes::DestinationUnreachable.0, code, 0, 0, 0, 0, 0, 0];
    message.extend_from_slice(&ip_header);
    message.extend_from_slice(&tcp_segment[..quoted_len]);
    message
}

/// IPv6 counterpart of [`create_unreachable_v4`].
pub fn create_unreachable_v6(
    src_addr: Ipv6Addr,
    dst_addr: Ipv6Addr,
    code: u8,
    tcp_segment: &[u8],
) -> Vec<u8> {
    let mut ip_header: [u8; IPV6_HDR_LEN] = [0u8; IPV6_HDR_LEN];
    ip_header[0] = 0x60;
    ip_header[4..6].copy_from_slice(&(tcp_segment.len() as u16).to_be_bytes());
    ip_header[6] = IpNextHeaderProtocols::Tcp.0;
    ip_header[7] = 64;
    ip_header[8..24].copy_from_slice(&src_addr.octets());
    ip_header[24..40].copy_from_slice(&dst_addr.octets());

    let mut message: Vec<u8> = vec![Icmpv6Types::DestinationUnreachable.0, code, 0, 0, 0, 0, 0, 0];
    message.extend_from_slice(&ip_header);
    message.extend_from_slice(tcp_segment);
    message
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
