use std::fmt;
use std::net::IpAddr;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    A,
    Aaaa,
    Ptr,
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordType::A => f.write_str("A"),
            RecordType::Aaaa => f.write_str("AAAA"),
            RecordType::Ptr => f.write_str("PTR"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordData {
    Addr(IpAddr),
    Name(String),
}

impl fmt::Display for RecordData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordData::Addr(ip) => write!(f, "{ip}"),
            RecordData::Name(name) => f.write_str(name),
        }
    }
}

/// Why a lookup produced no usable answer.
///
/// A successful reply with zero records is *not* an error: it is a record
/// with `error == None` and no values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("NXDOMAIN")]
    NxDomain,
    #[error("timeout")]
    Timeout,
    #[error("SERVFAIL")]
    ServFail,
    #[error("{0}")]
    Other(String),
}

/// Outcome of exactly one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRecord {
    pub name: String,
    pub record_type: RecordType,
    pub values: Vec<RecordData>,
    pub error: Option<LookupError>,
}

impl ResolutionRecord {
    pub fn answered(name: &str, record_type: RecordType, values: Vec<RecordData>) -> Self {
        Self {
            name: name.to_string(),
            record_type,
            values,
            error: None,
        }
    }

    pub fn failed(name: &str, record_type: RecordType, error: LookupError) -> Self {
        Self {
            name: name.to_string(),
            record_type,
            values: Vec::new(),
            error: Some(error),
        }
    }

    /// Resolved to at least one value.
    pub fn is_resolved(&self) -> bool {
        self.error.is_none() && !self.values.is_empty()
    }

    /// Answered without error but carried no records.
    pub fn is_empty(&self) -> bool {
        self.error.is_none() && self.values.is_empty()
    }

    pub fn addresses(&self) -> impl Iterator<Item = IpAddr> + '_ {
        self.values.iter().filter_map(|value| match value {
            RecordData::Addr(ip) => Some(*ip),
            RecordData::Name(_) => None,
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.values.iter().filter_map(|value| match value {
            RecordData::Name(name) => Some(name.as_str()),
            RecordData::Addr(_) => None,
        })
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
