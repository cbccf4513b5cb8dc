//! # Recon Common
//!
//! Shared vocabulary of the workspace: scan targets, probe and lookup
//! models, runtime configuration and the fatal error taxonomy.
//!
//! Nothing in here touches the network. The `core` crate owns every socket.

pub mod config;
pub mod error;
pub mod models;
pub mod network;
pub mod utils;
pub mod wordlist;
