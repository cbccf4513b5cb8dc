pub mod nameserver;
pub mod source;
pub mod transport;
