//! Locates the recursive resolver configured on this machine.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use hickory_resolver::config::{Protocol, ResolverConfig};
use hickory_resolver::system_conf::read_system_conf;
use recon_protocols::dns::DNS_PORT;
use tracing::{debug, warn};

pub const FALLBACK_NAMESERVER: SocketAddr =
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(1, 1, 1, 1), DNS_PORT));

/// First usable UDP nameserver of the system configuration, or
/// [`FALLBACK_NAMESERVER`].
pub fn system_nameserver() -> SocketAddr {
    match read_system_conf() {
        Ok((config, _opts)) => first_udp_nameserver(&config).unwrap_or_else(|| {
            warn!("No usable system nameserver, using {FALLBACK_NAMESERVER}");
            FALLBACK_NAMESERVER
        }),
        Err(e) => {
            warn!("Cannot read system resolver config ({e}), using {FALLBACK_NAMESERVER}");
            FALLBACK_NAMESERVER
        }
    }
}

pub fn first_udp_nameserver(config: &ResolverConfig) -> Option<SocketAddr> {
    let nameserver: SocketAddr = config
        .name_servers()
        .iter()
        .filter(|ns| ns.protocol == Protocol::Udp)
        .map(|ns| ns.socket_addr)
        .find(|addr| {
            let routable = is_routable(addr);
            if !routable {
                debug!("Skipping nameserver {addr}: link-local without a zone");
            }
            routable
        })?;

    debug!("Using system nameserver {nameserver}");
    Some(nameserver)
}

// The system config drops the `%zone` of link-local entries; without a scope id
// the kernel has no interface to send them out of.
fn is_routable(addr: &SocketAddr) -> bool {
    match addr {
        SocketAddr::V4(_) => true,
        SocketAddr::V6(v6) => !v6.ip().is_unicast_link_local() || v6.scope_id() != 0,
    }
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
    use std::net::{IpAddr, SocketAddrV6};

    use hickory_resolver::config::NameServerConfigGroup;

    use super::*;

    fn config_with(ips: &[IpAddr]) -> ResolverConfig {
        ResolverConfig::from_parts(None, vec![], NameServerConfigGroup::from_ips_clear(ips, DNS_PORT, true))
    }

    #[test]
    fn first_udp_nameserver_wins() {
        let config = config_with(&["192.168.0.1".parse().unwrap(), "8.8.8.8".parse().unwrap()]);
        assert_eq!(
            first_udp_nameserver(&config),
            Some("192.168.0.1:53".parse().unwrap())
        );
    }

    #[test]
    fn unscoped_link_local_is_skipped() {
        let config = config_with(&["fe80::1".parse().unwrap(), "192.0.2.53".parse().unwrap()]);
        assert_eq!(
            first_udp_nameserver(&config),
            Some("192.0.2.53:53".parse().unwrap())
        );
    }

    #[test]
    fn scoped_link_local_is_kept() {
        let scoped = SocketAddr::V6(SocketAddrV6::new("fe80::1".parse().unwrap(), DNS_PORT, 0, 2));
        assert!(is_routable(&scoped));
        assert!(is_routable(&"[::1]:53".parse().unwrap()));
    }

    #[test]
    fn no_usable_nameserver_yields_none() {
        assert_eq!(first_udp_nameserver(&config_with(&[])), None);
        assert_eq!(first_udp_nameserver(&config_with(&["fe80::1".parse().unwrap()])), None);
    }
}
