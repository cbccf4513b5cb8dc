//! # Result Models
//!
//! Every request issued by the engine produces exactly one of these values.
//! They carry their own target, port or name so they can be reported in any
//! order and are never mutated once built.

pub mod candidate;
pub mod probe;
pub mod resolution;

pub use candidate::Candidate;
pub use probe::{ProbeRequest, ProbeResult, Protocol, Verdict};
pub use resolution::{LookupError, RecordData, RecordType, ResolutionRecord};
