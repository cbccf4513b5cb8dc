pub mod dns;
pub mod ports;

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use recon_common::config::{Config, DEFAULT_WORKERS};
use recon_common::network::target::Target;
use recon_protocols::dns::DNS_PORT;

#[derive(Parser)]
#[command(name = "recon")]
#[command(version, about = "Port liveness and DNS topology prober.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Show per-probe detail (-vv for packet level)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Print less (-qq prints only findings)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Skip the banner
    #[arg(long, global = true)]
    pub no_banner: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// SYN-probe a host's ports and check for a DNS service
    #[command(alias = "p")]
    Ports(PortsArgs),
    /// Resolve a domain and brute-force its subdomains
    #[command(alias = "d")]
    Dns(DnsArgs),
}

#[derive(Args)]
pub struct PortsArgs {
    /// Address or host name to probe
    pub target: Target,

    /// Comma separated ports [default: 25,80,53,443,445,8080,8443]
    #[arg(short, long, value_delimiter = ',')]
    pub ports: Vec<u16>,

    /// Seconds to wait for each reply
    #[arg(short, long, default_value = "2", value_parser = parse_timeout)]
    pub timeout: Duration,

    /// Probes in flight at once
    #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,
}

#[derive(Args)]
pub struct DnsArgs {
    /// Base domain
    pub domain: Target,

    /// Subdomain wordlist, one word per line
    #[arg(long)]
    pub wordlist: Option<PathBuf>,

    /// Also try each word with the suffixes 0 to 9
    #[arg(short, long)]
    pub numeric: bool,

    /// Nameserver to query instead of the system one
    #[arg(short, long, value_parser = parse_nameserver)]
    pub resolver: Option<SocketAddr>,

    /// Seconds to wait for each answer
    #[arg(short, long, default_value = "3", value_parser = parse_timeout)]
    pub timeout: Duration,

    /// Lookups in flight at once
    #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl PortsArgs {
    pub fn config(&self) -> Config {
        Config {
            timeout: self.timeout,
            workers: self.workers,
            ..Config::default()
        }
    }
}

impl DnsArgs {
    pub fn config(&self) -> Config {
        Config {
            timeout: self.timeout,
            workers: self.workers,
            nameserver: self.resolver,
            ..Config::default()
        }
    }
}

fn parse_timeout(s: &str) -> Result<Duration, String> {
    let secs: f64 = s.parse().map_err(|_| format!("'{s}' is not a number of seconds"))?;
    if secs <= 0.0 {
        return Err("timeout must be greater than zero".to_string());
    }
    Duration::try_from_secs_f64(secs).map_err(|e| e.to_string())
}

fn parse_nameserver(s: &str) -> Result<SocketAddr, String> {
    if let Ok(addr) = s.parse::<SocketAddr>() {
        return Ok(addr);
    }
    s.parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, DNS_PORT))
        .map_err(|_| format!("'{s}' is not an IP or IP:PORT"))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
