//! # Scan Target Model
//!
//! Defines the possible inputs for a probe run.
//!
//! A target is either:
//! * A single IP address (host).
//! * A domain name, resolved once per run to one or more addresses.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

const MAX_NAME_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// Represents a distinct target to be probed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// Probe a single specific host.
    Host { target_addr: IpAddr },
    /// Probe whatever a domain name resolves to.
    Domain { name: String },
}

impl FromStr for Target {
    type Err = String;

    /// Parses a string into a `Target`.
    ///
    /// Supported formats:
    /// * **Host**: Single IPv4/IPv6 address (e.g., "192.168.1.5", "::1").
    /// * **Domain**: A hostname (e.g., "example.com", "api.example.com.").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if let Some(target) = parse_host(s) {
            return Ok(target);
        }

        parse_domain(s)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Host { target_addr } => write!(f, "{target_addr}"),
            Target::Domain { name } => f.write_str(name),
        }
    }
}

impl Target {
    /// The domain name, when the target is not an address literal.
    pub fn domain(&self) -> Option<&str> {
        match self {
            Target::Domain { name } => Some(name),
            Target::Host { .. } => None,
        }
    }
}

/// Parses a single IP address.
fn parse_host(s: &str) -> Option<Target> {
    s.parse::<IpAddr>()
        .ok()
        .map(|target_addr| Target::Host { target_addr })
}

/// Parses and normalizes a domain name (lowercase, no trailing dot).
fn parse_domain(s: &str) -> Result<Target, String> {
    let name: String = s.trim_end_matches('.').to_ascii_lowercase();

    if name.is_empty() {
        return Err("target cannot be empty".to_string());
    }
    if name.len() > MAX_NAME_LEN {
        return Err(format!("domain name longer than {MAX_NAME_LEN} bytes: {s}"));
    }
    if looks_numeric(&name) {
        return Err(format!("invalid IP address: {s}"));
    }

    for label in name.split('.') {
        validate_label(label).map_err(|e| format!("invalid target '{s}': {e}"))?;
    }

    Ok(Target::Domain { name })
}

pub fn validate_label(label: &str) -> Result<(), String> {
    if label.is_empty() {
        return Err("empty label".to_string());
    }
    if label.len() > MAX_LABEL_LEN {
        return Err(format!("label '{label}' exceeds {MAX_LABEL_LEN} bytes"));
    }
    if label.starts_with('-') || label.ends_with('-') {
        return Err(format!("label '{label}' starts or ends with a hyphen"));
    }
    if let Some(c) = label
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(format!("label '{label}' contains '{c}'"));
    }
    Ok(())
}

/// A dotted run of digits that failed to parse as an address (e.g. "10.0.0.256")
/// is a typo, not a hostname.
fn looks_numeric(name: &str) -> bool {
    name.split('.')
        .all(|label| !label.is_empty() && label.chars().all(|c| c.is_ascii_digit()))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
