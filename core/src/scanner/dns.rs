//! DNS service liveness.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use recon_common::models::{ProbeRequest, Protocol, RecordType};
use recon_protocols::dns::{self, DNS_PORT};
use tokio::net::UdpSocket;
use tracing::debug;

use crate::context::NetworkContext;

/// Sends one recursive A query to `addr:53`. Any datagram back from that
/// endpoint within `timeout` means a DNS service is there, whatever the
/// response code says.
pub async fn probe_dns_service(ctx: &NetworkContext, addr: IpAddr, timeout: Duration) -> bool {
    let endpoint = SocketAddr::new(addr, DNS_PORT);
    probe_dns_endpoint(endpoint, &ctx.config().liveness_query, timeout).await
}

/// [`probe_dns_service`] against an arbitrary endpoint.
pub async fn probe_dns_endpoint(endpoint: SocketAddr, query_name: &str, timeout: Duration) -> bool {
    let request = match liveness_request(endpoint, query_name) {
        Ok(request) => request,
        Err(e) => {
            debug!("Cannot build liveness query for {endpoint}: {e}");
            return false;
        }
    };
    match tokio::time::timeout(timeout, exchange(&request)).await {
        Ok(Ok(len)) => {
            debug!("{endpoint} answered the liveness query ({len} bytes)");
            true
        }
        Ok(Err(e)) => {
            debug!("DNS liveness probe to {endpoint} failed: {e}");
            false
        }
        Err(_) => {
            debug!("DNS liveness probe to {endpoint} timed out");
            false
        }
    }
}

/// One recursive A query for `query_name`, addressed to `endpoint` over UDP.
fn liveness_request(endpoint: SocketAddr, query_name: &str) -> anyhow::Result<ProbeRequest> {
    let query: Vec<u8> = dns::create_query_packet(query_name, RecordType::A, rand::random())?;
    Ok(ProbeRequest::new(endpoint.ip(), endpoint.port(), Protocol::Udp, query))
}

async fn exchange(request: &ProbeRequest) -> anyhow::Result<usize> {
    let endpoint: SocketAddr = request.socket_addr();
    let bind_addr: SocketAddr = match endpoint {
        SocketAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
        SocketAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
    };
    // A connected socket only sees datagrams from `endpoint` and surfaces
    // ICMP port unreachable as a refused receive.
    let socket = UdpSocket::bind(bind_addr).await?;
    socket.connect(endpoint).await?;

    socket.send(&request.payload).await?;

    let mut buffer = [0u8; 512];
    Ok(socket.recv(&mut buffer).await?)
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

    #[test]
    fn liveness_query_is_a_udp_request() {
        let endpoint: SocketAddr = "192.0.2.1:53".parse().unwrap();
        let request = liveness_request(endpoint, "google.com").unwrap();

        assert_eq!(request.protocol, Protocol::Udp);
        assert_eq!(request.socket_addr(), endpoint);
        // Header plus the question for google.com A.
        assert_eq!(request.payload.len(), 12 + 12 + 4);
        assert_eq!(request.payload[2] & 0x01, 0x01, "recursion desired");
    }

    #[tokio::test]
    async fn any_reply_counts() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let endpoint = server.local_addr().unwrap();
        tokio::spawn(async move {
            let mut buf = [0u8; 512];
            let (_, peer) = server.recv_from(&mut buf).await.unwrap();
            server.send_to(b"not even dns", peer).await.unwrap();
        });

        assert!(probe_dns_endpoint(endpoint, "google.com", Duration::from_secs(2)).await);
    }

    #[tokio::test]
    async fn silence_is_absence() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let endpoint = server.local_addr().unwrap();
        let started = std::time::Instant::now();

        assert!(!probe_dns_endpoint(endpoint, "google.com", Duration::from_millis(100)).await);
        assert!(started.elapsed() >= Duration::from_millis(100));
        drop(server);
    }
}
