//! Wire formats spoken by the probing engine.
//!
//! * [`tcp`]: SYN/RST segments and reply classification.
//! * [`icmp`]: destination-unreachable messages quoting a probe.
//! * [`dns`]: RFC 1035 queries and reply decoding.

pub mod dns;
pub mod icmp;
pub mod tcp;
