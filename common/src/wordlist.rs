//! Wordlist parsing for subdomain enumeration.
//!
//! One word per line. Blank lines and `#` comments are skipped and
//! surrounding whitespace is trimmed. Order is preserved.

use crate::network::target;

pub fn parse(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_ascii_lowercase)
        .collect()
}

/// Returns the words that cannot form a valid DNS label prefix.
pub fn invalid_words(words: &[String]) -> Vec<&str> {
    words
        .iter()
        .filter(|word| word.split('.').any(|label| target::validate_label(label).is_err()))
        .map(String::as_str)
        .collect()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
