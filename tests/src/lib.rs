#![cfg(test)]

mod enumeration;
mod probing;
mod resolution;
mod util;
