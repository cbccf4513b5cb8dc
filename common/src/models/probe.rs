use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => f.write_str("tcp"),
            Protocol::Udp => f.write_str("udp"),
        }
    }
}

/// Liveness verdict of a single port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// SYN+ACK received.
    Open,
    /// RST received.
    Closed,
    /// ICMP unreachable, or a reply whose flags fit neither of the above.
    Filtered,
    /// Nothing came back before the timeout. Filtered or down, never closed.
    NoResponse,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label: &str = match self {
            Verdict::Open => "open",
            Verdict::Closed => "closed",
            Verdict::Filtered => "filtered",
            Verdict::NoResponse => "no-response",
        };
        f.write_str(label)
    }
}

/// One outgoing probe. Built fresh for every attempt.
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    pub target: IpAddr,
    pub port: u16,
    pub protocol: Protocol,
    pub payload: Vec<u8>,
}

impl ProbeRequest {
    pub fn new(target: IpAddr, port: u16, protocol: Protocol, payload: Vec<u8>) -> Self {
        Self {
            target,
            port,
            protocol,
            payload,
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.target, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub target: IpAddr,
    pub port: u16,
    pub protocol: Protocol,
    pub verdict: Verdict,
    pub elapsed: Duration,
}

impl ProbeResult {
    pub fn new(request: &ProbeRequest, verdict: Verdict, elapsed: Duration) -> Self {
        Self {
            target: request.target,
            port: request.port,
            protocol: request.protocol,
            verdict,
            elapsed,
        }
    }

    pub fn is_open(&self) -> bool {
        self.verdict == Verdict::Open
    }
}
