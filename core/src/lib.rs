//! # Recon Core
//!
//! The probing and resolution engine.
//!
//! Every entry point takes a [`context::NetworkContext`], which owns the raw
//! channels, the resolver socket and the configuration of the run:
//!
//! * [`scanner::probe_ports`] / [`scanner::syn::probe`]: half-open TCP probing
//! * [`scanner::dns::probe_dns_service`]: DNS service liveness
//! * [`resolver::resolve`] / [`resolver::reverse_resolve`]: forward and PTR lookups
//! * [`enumerate::enumerate`]: wordlist subdomain discovery

pub mod context;
pub mod demux;
pub mod enumerate;
pub mod network;
pub mod pool;
pub mod resolver;
pub mod scanner;

pub use context::NetworkContext;
pub use resolver::resolve_target;
