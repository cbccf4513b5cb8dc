//! Errors that abort a run before any probe is sent.
//!
//! Everything that can go wrong *during* a probe or lookup is captured in the
//! result itself (see [`crate::models`]) and never surfaces as an `Err`.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StartupError {
    /// Raw sockets could not be opened, usually for lack of `CAP_NET_RAW`.
    #[error("insufficient privileges for raw sockets: {0}")]
    Privilege(String),

    /// Malformed target, unreadable wordlist or an out-of-range argument.
    #[error("invalid input: {0}")]
    Input(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl StartupError {
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }
}
