use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use recon_common::config::Config;
use recon_common::error::StartupError;
use recon_common::models::Verdict;
use recon_core::network::transport::{Inbound, SegmentSender, TransportType};
use recon_core::scanner::{self, dns, syn};
use recon_core::NetworkContext;
use recon_protocols::icmp;
use recon_protocols::tcp::{self, Segment, SegmentKind, TcpReply};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

use crate::util::{fake_nameserver, Answer};

const LOOPBACK: Ipv4Addr = Ipv4Addr::new(127, 0, 0, 1);
const TARGET: IpAddr = IpAddr::V4(LOOPBACK);

/// Hands every outgoing segment to the simulated remote host.
struct Wire {
    tx: mpsc::UnboundedSender<(Vec<u8>, IpAddr)>,
}

impl SegmentSender for Wire {
    fn send_segment(&self, segment: &[u8], destination: IpAddr) -> io::Result<()> {
        self.tx
            .send((segment.to_vec(), destination))
            .map_err(|_| io::Error::from(io::ErrorKind::BrokenPipe))
    }
}

/// Remote host behaviour per port. Later ports answer sooner, so replies
/// come back in the reverse order of the probes.
fn remote_host(mut wire: mpsc::UnboundedReceiver<(Vec<u8>, IpAddr)>, inbound: mpsc::UnboundedSender<Inbound>) {
    tokio::spawn(async move {
        while let Some((syn, _)) = wire.recv().await {
            let packet = tcp::get_packet_from_u8(&syn).unwrap();
            if tcp::classify(&packet) == TcpReply::Rst {
                continue;
            }
            let (local_port, remote_port, sequence) = syn::decode_probe(&syn).unwrap();
            let reply = Segment {
                src_addr: TARGET,
                dst_addr: TARGET,
                src_port: remote_port,
                dst_port: local_port,
                sequence: 7,
                acknowledgement: sequence.wrapping_add(1),
            };
            let message = match remote_port {
                80 | 443 => Some((TransportType::TcpV4, tcp::create_packet(&reply, SegmentKind::SynAck).unwrap())),
                22 => Some((TransportType::TcpV4, tcp::create_packet(&reply, SegmentKind::RstAck).unwrap())),
                25 => Some((TransportType::IcmpV4, icmp::create_unreachable_v4(LOOPBACK, LOOPBACK, 13, &syn))),
                8080 => Some((TransportType::TcpV4, tcp::create_packet(&reply, SegmentKind::Ack).unwrap())),
                _ => None,
            };
            let Some((kind, bytes)) = message else {
                continue;
            };

            let delay = Duration::from_millis(200u64.saturating_sub(remote_port as u64 % 200));
            let inbound = inbound.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = inbound.send(Inbound {
                    kind,
                    bytes,
                    source: TARGET,
                });
            });
        }
    });
}

/// Several hosts listening on the same port. Replies are held until `batch`
/// SYNs have arrived and then released newest first.
fn remote_hosts(
    mut wire: mpsc::UnboundedReceiver<(Vec<u8>, IpAddr)>,
    inbound: mpsc::UnboundedSender<Inbound>,
    batch: usize,
) {
    tokio::spawn(async move {
        let mut held: Vec<(Vec<u8>, IpAddr)> = Vec::new();
        while let Some((segment, destination)) = wire.recv().await {
            let packet = tcp::get_packet_from_u8(&segment).unwrap();
            if tcp::classify(&packet) == TcpReply::Rst {
                continue;
            }
            held.push((segment, destination));
            if held.len() < batch {
                continue;
            }

            for (syn, host) in held.drain(..).rev() {
                let IpAddr::V4(host_v4) = host else {
                    continue;
                };
                let (local_port, remote_port, sequence) = syn::decode_probe(&syn).unwrap();
                let reply = Segment {
                    src_addr: host,
                    dst_addr: TARGET,
                    src_port: remote_port,
                    dst_port: local_port,
                    sequence: 7,
                    acknowledgement: sequence.wrapping_add(1),
                };
                let (kind, bytes) = match host_v4.octets()[3] {
                    2 => (TransportType::TcpV4, tcp::create_packet(&reply, SegmentKind::SynAck).unwrap()),
                    3 => (TransportType::TcpV4, tcp::create_packet(&reply, SegmentKind::RstAck).unwrap()),
                    _ => (TransportType::IcmpV4, icmp::create_unreachable_v4(LOOPBACK, host_v4, 13, &syn)),
                };
                let source: IpAddr = if kind == TransportType::IcmpV4 { TARGET } else { host };
                let _ = inbound.send(Inbound { kind, bytes, source });
            }
        }
    });
}

async fn simulated_context(timeout: Duration) -> NetworkContext {
    let (wire_tx, wire_rx) = mpsc::unbounded_channel();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    remote_host(wire_rx, inbound_tx);

    let nameserver = fake_nameserver(|_, _| Answer::NxDomain).await;
    let config = Config {
        timeout,
        workers: 16,
        nameserver: Some(nameserver),
        ..Config::default()
    };
    NetworkContext::with_segment_sender(config, Arc::new(Wire { tx: wire_tx }), inbound_rx)
        .await
        .unwrap()
}

#[tokio::test]
async fn every_port_gets_its_own_verdict() {
    let timeout = Duration::from_millis(400);
    let ctx = simulated_context(timeout).await;
    let ports = [22, 25, 80, 443, 8080, 9999];

    let results = scanner::probe_ports(&ctx, TARGET, &ports, timeout).await.unwrap();

    let verdicts: Vec<(u16, Verdict)> = results.iter().map(|r| (r.port, r.verdict)).collect();
    assert_eq!(
        verdicts,
        vec![
            (22, Verdict::Closed),
            (25, Verdict::Filtered),
            (80, Verdict::Open),
            (443, Verdict::Open),
            (8080, Verdict::Filtered),
            (9999, Verdict::NoResponse),
        ]
    );
    assert!(results.iter().all(|r| r.target == TARGET));
    assert_eq!(ctx.syn_engine().unwrap().in_flight(), 0);
    ctx.shutdown().await;
}

#[tokio::test]
async fn same_port_on_different_hosts_does_not_cross_talk() {
    let hosts: [IpAddr; 3] = [
        IpAddr::V4(Ipv4Addr::new(127, 0, 0, 2)),
        IpAddr::V4(Ipv4Addr::new(127, 0, 0, 3)),
        IpAddr::V4(Ipv4Addr::new(127, 0, 0, 4)),
    ];
    let (wire_tx, wire_rx) = mpsc::unbounded_channel();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    remote_hosts(wire_rx, inbound_tx, hosts.len());

    let nameserver = fake_nameserver(|_, _| Answer::NxDomain).await;
    let timeout = Duration::from_secs(1);
    let config = Config {
        timeout,
        nameserver: Some(nameserver),
        ..Config::default()
    };
    let ctx = NetworkContext::with_segment_sender(config, Arc::new(Wire { tx: wire_tx }), inbound_rx)
        .await
        .unwrap();

    let (a, b, c) = tokio::join!(
        syn::probe(&ctx, hosts[0], 80, timeout),
        syn::probe(&ctx, hosts[1], 80, timeout),
        syn::probe(&ctx, hosts[2], 80, timeout),
    );
    let results: Vec<(IpAddr, u16, Verdict)> = [a, b, c]
        .into_iter()
        .map(|r| r.unwrap())
        .map(|r| (r.target, r.port, r.verdict))
        .collect();

    assert_eq!(
        results,
        vec![
            (hosts[0], 80, Verdict::Open),
            (hosts[1], 80, Verdict::Closed),
            (hosts[2], 80, Verdict::Filtered),
        ]
    );
    assert_eq!(ctx.syn_engine().unwrap().in_flight(), 0);
    ctx.shutdown().await;
}

#[tokio::test]
async fn no_response_waits_out_the_timeout() {
    let timeout = Duration::from_millis(250);
    let ctx = simulated_context(timeout).await;

    let result = syn::probe(&ctx, TARGET, 9999, timeout).await.unwrap();

    assert_eq!(result.verdict, Verdict::NoResponse);
    assert!(result.elapsed >= timeout);
    assert!(result.elapsed < timeout + Duration::from_millis(500));
}

#[tokio::test]
async fn bad_input_is_rejected_before_sending() {
    let ctx = simulated_context(Duration::from_millis(100)).await;

    assert!(scanner::probe_ports(&ctx, TARGET, &[80, 0], Duration::from_millis(100)).await.is_err());
    assert!(syn::probe(&ctx, TARGET, 80, Duration::ZERO).await.is_err());
}

#[tokio::test]
async fn context_without_raw_sockets_cannot_syn_probe() {
    let nameserver = fake_nameserver(|_, _| Answer::NxDomain).await;
    let config = Config {
        nameserver: Some(nameserver),
        ..Config::default()
    };
    let ctx = NetworkContext::open(config, false).await.unwrap();

    assert!(ctx.syn_engine().is_none());
    assert!(matches!(
        scanner::probe_ports(&ctx, TARGET, &[80], Duration::from_millis(100)).await,
        Err(StartupError::Privilege(_))
    ));
    assert!(matches!(
        syn::probe(&ctx, TARGET, 80, Duration::from_millis(100)).await,
        Err(StartupError::Privilege(_))
    ));
}

#[tokio::test]
async fn refused_dns_reply_still_means_present() {
    let server = fake_nameserver(|_, _| Answer::Refused).await;
    assert!(dns::probe_dns_endpoint(server, "google.com", Duration::from_secs(1)).await);
}

#[tokio::test]
async fn closed_dns_port_means_absent() {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let endpoint: SocketAddr = socket.local_addr().unwrap();
    drop(socket);

    assert!(!dns::probe_dns_endpoint(endpoint, "google.com", Duration::from_millis(300)).await);
}
