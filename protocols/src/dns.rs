use std::fmt;
use std::net::IpAddr;

use anyhow::{Context, ensure};
use dns_parser::{Packet, RData, ResponseCode};
use pnet::packet::dns::{DnsClass, DnsQuery, DnsType, DnsTypes, MutableDnsPacket, Opcode, Retcode};

use recon_common::models::{RecordData, RecordType};

pub const DNS_HDR_LEN: usize = 12;
pub const DNS_PORT: u16 = 53;

/// Response code of a DNS reply, as far as the engine cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rcode {
    NoError,
    FormErr,
    ServFail,
    NxDomain,
    NotImp,
    Refused,
    Other(u8),
}

impl fmt::Display for Rcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rcode::NoError => f.write_str("NOERROR"),
            Rcode::FormErr => f.write_str("FORMERR"),
            Rcode::ServFail => f.write_str("SERVFAIL"),
            Rcode::NxDomain => f.write_str("NXDOMAIN"),
            Rcode::NotImp => f.write_str("NOTIMP"),
            Rcode::Refused => f.write_str("REFUSED"),
            Rcode::Other(code) => write!(f, "RCODE{code}"),
        }
    }
}

impl From<ResponseCode> for Rcode {
    fn from(code: ResponseCode) -> Self {
        match code {
            ResponseCode::NoError => Rcode::NoError,
            ResponseCode::FormatError => Rcode::FormErr,
            ResponseCode::ServerFailure => Rcode::ServFail,
            ResponseCode::NameError => Rcode::NxDomain,
            ResponseCode::NotImplemented => Rcode::NotImp,
            ResponseCode::Refused => Rcode::Refused,
            ResponseCode::Reserved(code) => Rcode::Other(code),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsReply {
    pub id: u16,
    pub rcode: Rcode,
    pub truncated: bool,
    /// Answer records matching the queried type, in wire order.
    pub records: Vec<RecordData>,
}

/// Reads the transaction id without parsing the rest of the message.
pub fn get_transaction_id(payload: &[u8]) -> Option<u16> {
    match payload {
        [hi, lo, ..] if payload.len() >= DNS_HDR_LEN => Some(u16::from_be_bytes([*hi, *lo])),
        _ => None,
    }
}

/// Parses a reply and keeps the answers of the requested type.
pub fn parse_reply(payload: &[u8], record_type: RecordType) -> anyhow::Result<DnsReply> {
    let packet = Packet::parse(payload).context("failed to parse DNS reply")?;
    ensure!(!packet.header.query, "DNS message {} is a query", packet.header.id);

    let records: Vec<RecordData> = packet
        .answers
        .iter()
        .filter_map(|answer| match (&answer.data, record_type) {
            (RData::A(a), RecordType::A) => Some(RecordData::Addr(IpAddr::V4(a.0))),
            (RData::AAAA(aaaa), RecordType::Aaaa) => Some(RecordData::Addr(IpAddr::V6(aaaa.0))),
            (RData::PTR(ptr), RecordType::Ptr) => Some(RecordData::Name(ptr.0.to_string())),
            _ => None,
        })
        .collect();

    Ok(DnsReply {
        id: packet.header.id,
        rcode: packet.header.response_code.into(),
        truncated: packet.header.truncated,
        records,
    })
}

pub fn create_query_packet(name: &str, record_type: RecordType, id: u16) -> anyhow::Result<Vec<u8>> {
    let query: DnsQuery = create_query(name, to_dns_type(record_type))?;
    let q_fixed_len: usize = 4;
    let qlen: usize = query.qname.len() + q_fixed_len;
    let total: usize = DNS_HDR_LEN + qlen;
    let mut buffer: Vec<u8> = vec![0u8; total];

    {
        let mut dns: MutableDnsPacket =
            MutableDnsPacket::new(&mut buffer).context("creating dns header")?;
        dns.set_id(id);
        dns.set_is_response(0);
        dns.set_opcode(Opcode::StandardQuery);
        dns.set_is_authoriative(0);
        dns.set_is_truncated(0);
        dns.set_is_recursion_desirable(1);
        dns.set_is_recursion_available(0);
        dns.set_zero_reserved(0);
        dns.set_is_non_authenticated_data(0);
        dns.set_rcode(Retcode::NoError);
        dns.set_query_count(1);
        dns.set_response_count(0);
        dns.set_authority_rr_count(0);
        dns.set_additional_rr_count(0);
    }

    // Question section is written by hand, pnet cannot serialize it.
    let mut cursor: usize = DNS_HDR_LEN;

    buffer[cursor..cursor + query.qname.len()].copy_from_slice(&query.qname);
    cursor += query.qname.len();

    buffer[cursor..cursor + 2].copy_from_slice(&query.qtype.0.to_be_bytes());
    cursor += 2;

    buffer[cursor..cursor + 2].copy_from_slice(&query.qclass.0.to_be_bytes());

    Ok(buffer)
}

fn to_dns_type(record_type: RecordType) -> DnsType {
    match record_type {
        RecordType::A => DnsTypes::A,
        RecordType::Aaaa => DnsTypes::AAAA,
        RecordType::Ptr => DnsTypes::PTR,
    }
}

fn create_query(name: &str, qtype: DnsType) -> anyhow::Result<DnsQuery> {
    let qname: Vec<u8> = encode_dns_name(name)?;
    Ok(DnsQuery {
        qname,
        qtype,
        qclass: DnsClass(1),
        payload: Vec::new(),
    })
}

fn encode_dns_name(name: &str) -> anyhow::Result<Vec<u8>> {
    let mut encoded: Vec<u8> = Vec::new();
    for label in name.split('.') {
        if label.is_empty() {
            continue;
        }
        ensure!(label.len() <= 63, "label '{label}' is longer than 63 bytes");
        encoded.push(label.len() as u8);
        encoded.extend_from_slice(label.as_bytes());
    }
    encoded.push(0);
    ensure!(encoded.len() <= 255, "name '{name}' is longer than 255 bytes");
    Ok(encoded)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    /// Turns a query into a reply carrying `rcode` and the given A answers.
    fn reply_to(query: &[u8], rcode: u8, answers: &[Ipv4Addr]) -> Vec<u8> {
        let mut reply: Vec<u8> = query.to_vec();
        reply[2] |= 0x80;
        reply[3] = 0x80 | rcode;
        reply[6..8].copy_from_slice(&(answers.len() as u16).to_be_bytes());
        for addr in answers {
            reply.extend_from_slice(&[0xc0, 0x0c, 0, 1, 0, 1, 0, 0, 0, 60, 0, 4]);
            reply.extend_from_slice(&addr.octets());
        }
        reply
    }

    #[test]
    fn query_has_expected_wire_layout() {
        let packet = create_query_packet("google.com", RecordType::A, 0xbeef).unwrap();
        assert_eq!(&packet[..4], &[0xbe, 0xef, 0x01, 0x00]);
        assert_eq!(&packet[4..6], &[0, 1]);
        assert_eq!(&packet[12..24], b"\x06google\x03com\x00");
        assert_eq!(&packet[24..], &[0, 1, 0, 1]);
    }

    #[test]
    fn ptr_query_uses_reverse_zone() {
        let ip: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1));
        let name = recon_common::utils::ip::reverse_address_to_ptr(&ip);
        let packet = create_query_packet(&name, RecordType::Ptr, 7).unwrap();
        let name = b"\x011\x012\x010\x03192\x07in-addr\x04arpa\x00";
        assert_eq!(&packet[12..12 + name.len()], name);
        assert_eq!(&packet[12 + name.len()..], &[0, 12, 0, 1]);
    }

    #[test]
    fn oversized_label_is_rejected() {
        let name = format!("{}.com", "a".repeat(64));
        assert!(create_query_packet(&name, RecordType::A, 1).is_err());
    }

    #[test]
    fn reply_answers_and_rcode_are_decoded() {
        let query = create_query_packet("example.com", RecordType::A, 42).unwrap();
        let addr = Ipv4Addr::new(93, 184, 215, 14);

        let reply = parse_reply(&reply_to(&query, 0, &[addr]), RecordType::A).unwrap();
        assert_eq!(reply.id, 42);
        assert_eq!(reply.rcode, Rcode::NoError);
        assert_eq!(reply.records, vec![RecordData::Addr(IpAddr::V4(addr))]);

        let reply = parse_reply(&reply_to(&query, 3, &[]), RecordType::A).unwrap();
        assert_eq!(reply.rcode, Rcode::NxDomain);
        assert!(reply.records.is_empty());

        let reply = parse_reply(&reply_to(&query, 2, &[]), RecordType::A).unwrap();
        assert_eq!(reply.rcode, Rcode::ServFail);
    }

    #[test]
    fn answers_of_other_types_are_dropped() {
        let query = create_query_packet("example.com", RecordType::A, 9).unwrap();
        let reply = reply_to(&query, 0, &[Ipv4Addr::new(10, 0, 0, 1)]);
        let parsed = parse_reply(&reply, RecordType::Aaaa).unwrap();
        assert!(parsed.records.is_empty());
    }

    #[test]
    fn queries_and_garbage_are_not_replies() {
        let query = create_query_packet("example.com", RecordType::A, 9).unwrap();
        assert!(parse_reply(&query, RecordType::A).is_err());
        assert!(parse_reply(&[0u8; 5], RecordType::A).is_err());
        assert_eq!(get_transaction_id(&query), Some(9));
        assert_eq!(get_transaction_id(&[1, 2, 3]), None);
    }
}
