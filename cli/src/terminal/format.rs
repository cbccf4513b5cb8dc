use std::net::{IpAddr, Ipv6Addr};

use colored::*;
use recon_common::models::{ProbeResult, Verdict};

use crate::terminal::colors;

pub fn ipv6_to_type_str(ipv6_addr: &Ipv6Addr) -> &'static str {
    if is_global_unicast(ipv6_addr) {
        return "GUA";
    }
    if ipv6_addr.is_unique_local() {
        return "ULA";
    }
    if ipv6_addr.is_unicast_link_local() {
        return "LLA";
    }
    "IPv6"
}

fn is_global_unicast(ipv6_addr: &Ipv6Addr) -> bool {
    let first_byte = ipv6_addr.octets()[0];
    (0x20..=0x3F).contains(&first_byte)
}

pub fn ip_to_key_value_pair(ips: &[IpAddr]) -> Vec<(String, ColoredString)> {
    ips.iter()
        .map(|ip| match ip {
            IpAddr::V4(ipv4_addr) => {
                let value = ipv4_addr.to_string().color(colors::IPV4_ADDR);
                (String::from("IPv4"), value)
            }
            IpAddr::V6(ipv6_addr) => {
                let ipv6_type = ipv6_to_type_str(ipv6_addr);
                let ipv6_addr = ipv6_addr.to_string().color(colors::IPV6_ADDR);
                (String::from(ipv6_type), ipv6_addr)
            }
        })
        .collect()
}

pub fn verdict(verdict: Verdict) -> ColoredString {
    let label: String = verdict.to_string();
    match verdict {
        Verdict::Open => label.color(colors::OPEN).bold(),
        Verdict::Closed => label.color(colors::CLOSED),
        Verdict::Filtered => label.color(colors::FILTERED),
        Verdict::NoResponse => label.color(colors::NO_RESPONSE),
    }
}

pub fn port_to_detail(result: &ProbeResult) -> (String, ColoredString) {
    let key: String = format!("{}/{}", result.port, result.protocol);
    let elapsed: ColoredString = format!("{}ms", result.elapsed.as_millis()).color(colors::SEPARATOR);
    (key, format!("{} {}", verdict(result.verdict), elapsed).normal())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
