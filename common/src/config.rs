use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_WORKERS: usize = 32;
pub const DEFAULT_LIVENESS_QUERY: &str = "google.com";

#[derive(Debug, Clone)]
pub struct Config {
    /// Upper bound a single probe or lookup waits for its reply.
    pub timeout: Duration,

    /// Maximum number of probes or lookups in flight at once.
    pub workers: usize,

    /// Recursive resolver used for every lookup.
    ///
    /// `None` selects the first nameserver of the system configuration.
    pub nameserver: Option<SocketAddr>,

    /// Tears down half-open connections with a RST after a SYN+ACK.
    pub send_rst: bool,

    /// Name asked for by the DNS liveness probe. Any reply counts.
    pub liveness_query: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            workers: DEFAULT_WORKERS,
            nameserver: None,
            send_rst: true,
            liveness_query: DEFAULT_LIVENESS_QUERY.to_string(),
        }
    }
}
