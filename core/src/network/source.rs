use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

/// Any port works, connecting a UDP socket sends nothing.
const ROUTE_PROBE_PORT: u16 = 9;

/// Local address the routing table picks to reach `target`.
///
/// Connecting a UDP socket performs the route lookup without sending a packet.
pub fn source_addr_for(target: IpAddr) -> io::Result<IpAddr> {
    let bind_addr: SocketAddr = match target {
        IpAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
        IpAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
    };
    let socket: UdpSocket = UdpSocket::bind(bind_addr)?;
    socket.connect(SocketAddr::new(target, ROUTE_PROBE_PORT))?;
    Ok(socket.local_addr()?.ip())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
