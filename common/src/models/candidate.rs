use std::fmt;

/// A subdomain guess: `word` plus an optional digit, under the base domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Candidate {
    pub word: String,
    pub suffix: Option<u8>,
    pub fqdn: String,
}

impl Candidate {
    pub fn new(word: &str, suffix: Option<u8>, base_domain: &str) -> Self {
        let fqdn: String = match suffix {
            Some(digit) => format!("{word}{digit}.{base_domain}"),
            None => format!("{word}.{base_domain}"),
        };
        Self {
            word: word.to_string(),
            suffix,
            fqdn,
        }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fqdn)
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
