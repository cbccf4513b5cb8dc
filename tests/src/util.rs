use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use recon_common::config::Config;
use recon_core::NetworkContext;
use tokio::net::UdpSocket;

/// How the fake nameserver answers one query.
#[derive(Clone, Debug)]
pub enum Answer {
    A(Vec<Ipv4Addr>),
    Ptr(Vec<String>),
    NxDomain,
    ServFail,
    Refused,
    /// Swallow the query.
    Silent,
    /// Answer after a pause.
    Delayed(Duration, Box<Answer>),
}

const TYPE_A: u16 = 1;
const TYPE_PTR: u16 = 12;

/// Starts a nameserver on loopback that answers with `zone(name, qtype)`.
pub async fn fake_nameserver<F>(zone: F) -> SocketAddr
where
    F: Fn(&str, u16) -> Answer + Send + Sync + 'static,
{
    let socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
    let addr = socket.local_addr().unwrap();
    let zone = Arc::new(zone);

    tokio::spawn(async move {
        let mut buf = [0u8; 512];
        loop {
            let Ok((len, peer)) = socket.recv_from(&mut buf).await else {
                return;
            };
            let query = buf[..len].to_vec();
            let Some((name, qtype, question_end)) = parse_question(&query) else {
                continue;
            };
            let answer = zone(&name, qtype);
            let socket = socket.clone();
            tokio::spawn(async move {
                if let Some(reply) = build_reply(&query[..question_end], answer).await {
                    let _ = socket.send_to(&reply, peer).await;
                }
            });
        }
    });

    addr
}

/// Context resolving through `nameserver`, without raw sockets.
pub async fn dns_context(nameserver: SocketAddr, timeout: Duration) -> NetworkContext {
    let config = Config {
        timeout,
        workers: 8,
        nameserver: Some(nameserver),
        ..Config::default()
    };
    NetworkContext::open(config, false).await.unwrap()
}

fn parse_question(query: &[u8]) -> Option<(String, u16, usize)> {
    let mut labels: Vec<String> = Vec::new();
    let mut cursor: usize = 12;
    loop {
        let len = *query.get(cursor)? as usize;
        cursor += 1;
        if len == 0 {
            break;
        }
        labels.push(String::from_utf8_lossy(query.get(cursor..cursor + len)?).into_owned());
        cursor += len;
    }
    let qtype = u16::from_be_bytes([*query.get(cursor)?, *query.get(cursor + 1)?]);
    Some((labels.join("."), qtype, cursor + 4))
}

fn encode_name(name: &str) -> Vec<u8> {
    let mut out = Vec::new();
    for label in name.split('.').filter(|l| !l.is_empty()) {
        out.push(label.len() as u8);
        out.extend_from_slice(label.as_bytes());
    }
    out.push(0);
    out
}

fn build_reply(
    question: &[u8],
    answer: Answer,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Option<Vec<u8>>> + Send + '_>> {
    Box::pin(async move {
        let (rcode, records): (u8, Vec<(u16, Vec<u8>)>) = match answer {
            Answer::A(addrs) => (0, addrs.iter().map(|a| (TYPE_A, a.octets().to_vec())).collect()),
            Answer::Ptr(names) => (0, names.iter().map(|n| (TYPE_PTR, encode_name(n))).collect()),
            Answer::NxDomain => (3, Vec::new()),
            Answer::ServFail => (2, Vec::new()),
            Answer::Refused => (5, Vec::new()),
            Answer::Silent => return None,
            Answer::Delayed(pause, inner) => {
                tokio::time::sleep(pause).await;
                return build_reply(question, *inner).await;
            }
        };

        let mut reply = question.to_vec();
        reply[2] = 0x80 | (question[2] & 0x01);
        reply[3] = 0x80 | rcode;
        reply[6..8].copy_from_slice(&(records.len() as u16).to_be_bytes());
        reply[8..12].fill(0);
        for (rtype, rdata) in records {
            reply.extend_from_slice(&[0xc0, 0x0c]);
            reply.extend_from_slice(&rtype.to_be_bytes());
            reply.extend_from_slice(&[0, 1, 0, 0, 0, 60]);
            reply.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
            reply.extend_from_slice(&rdata);
        }
        Some(reply)
    })
}
