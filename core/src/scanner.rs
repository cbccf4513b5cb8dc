//! Port and service probing.
//!
//! [`syn`] does half-open TCP probing over the context's raw channels,
//! [`dns`] checks whether something answers DNS on UDP port 53.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use recon_common::error::StartupError;
use recon_common::models::ProbeResult;

use crate::context::NetworkContext;
use crate::pool;

pub mod dns;
pub mod syn;

use syn::SynEngine;

/// Ports probed when the caller names none.
pub const WELL_KNOWN_PORTS: [u16; 7] = [25, 80, 53, 443, 445, 8080, 8443];

/// Probes every port of `addr` through the worker pool.
///
/// Results come back in the order of `ports`. Only bad input or a context
/// without raw sockets is an error; each port's outcome is in its verdict.
pub async fn probe_ports(
    ctx: &NetworkContext,
    addr: IpAddr,
    ports: &[u16],
    timeout: Duration,
) -> Result<Vec<ProbeResult>, StartupError> {
    validate(ports, timeout)?;
    let engine: Arc<SynEngine> = raw_engine(ctx)?;

    let indexed: Vec<(usize, u16)> = ports.iter().copied().enumerate().collect();
    let rx = pool::dispatch(indexed, ctx.config().workers, move |(index, port)| {
        let engine = Arc::clone(&engine);
        async move { (index, engine.probe(addr, port, timeout).await) }
    });

    let mut results: Vec<(usize, ProbeResult)> = pool::collect(rx).await;
    results.sort_unstable_by_key(|(index, _)| *index);
    Ok(results.into_iter().map(|(_, result)| result).collect())
}

pub(crate) fn validate(ports: &[u16], timeout: Duration) -> Result<(), StartupError> {
    if ports.contains(&0) {
        return Err(StartupError::input("port 0 cannot be probed"));
    }
    if timeout.is_zero() {
        return Err(StartupError::input("timeout must be greater than zero"));
    }
    Ok(())
}

pub(crate) fn raw_engine(ctx: &NetworkContext) -> Result<Arc<SynEngine>, StartupError> {
    ctx.syn_engine()
        .cloned()
        .ok_or_else(|| StartupError::Privilege("network context was opened without raw sockets".into()))
}
