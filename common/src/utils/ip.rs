use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

const IPV4_REVERSE_ZONE: &str = "in-addr.arpa";
const IPV6_REVERSE_ZONE: &str = "ip6.arpa";

/// Builds the reverse-lookup name for an address.
///
/// * `192.0.2.10` becomes `10.2.0.192.in-addr.arpa`
/// * IPv6 addresses are expanded to 32 nibbles, reversed, and placed under `ip6.arpa`
pub fn reverse_address_to_ptr(ip_addr: &IpAddr) -> String {
    match ip_addr {
        IpAddr::V4(ipv4_addr) => format!("{}.{IPV4_REVERSE_ZONE}", reverse_ipv4(ipv4_addr)),
        IpAddr::V6(ipv6_addr) => format!("{}.{IPV6_REVERSE_ZONE}", reverse_ipv6(ipv6_addr)),
    }
}

fn reverse_ipv4(ipv4_addr: &Ipv4Addr) -> String {
    let [a, b, c, d] = ipv4_addr.octets();
    format!("{d}.{c}.{b}.{a}")
}

fn reverse_ipv6(ipv6_addr: &Ipv6Addr) -> String {
    ipv6_addr
        .octets()
        .iter()
        .rev()
        .flat_map(|byte| [byte & 0x0f, byte >> 4])
        .map(|nibble| format!("{nibble:x}"))
        .collect::<Vec<String>>()
        .join(".")
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
