//! Progress display attached to tracing spans.
//!
//! The indicatif layer draws a bar for every span entered with
//! `indicatif.pb_show`, and log lines are routed around it.

use colored::*;
use indicatif::ProgressStyle;
use tracing::Span;
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::terminal::colors;

const TICKS: &[&str] = &[
    "▁▁▁▁▁",
    "▁▂▂▂▁",
    "▁▄▂▄▁",
    "▂▄▆▄▂",
    "▄▆█▆▄",
    "▂▄▆▄▂",
    "▁▄▂▄▁",
    "▁▂▂▂▁",
];

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(TICKS)
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.blue} {msg} [{bar:30.green/white}] {pos}/{len} ({eta})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .tick_strings(TICKS)
        .progress_chars("=> ")
}

/// Turns `span` into a spinner showing `msg`.
pub fn start_spinner(span: &Span, msg: &str) {
    span.pb_set_style(&spinner_style());
    span.pb_set_message(&format!("{}", msg.color(colors::TEXT_DEFAULT)));
}

/// Turns `span` into a progress bar over `len` steps.
pub fn start_progress(span: &Span, msg: &str, len: usize) {
    span.pb_set_style(&bar_style());
    span.pb_set_length(len as u64);
    span.pb_set_message(&format!("{}", msg.color(colors::TEXT_DEFAULT)));
}

pub fn advance(span: &Span, found: usize) {
    span.pb_inc(1);
    span.pb_set_message(&format!(
        "Found {} so far",
        format!("{found} names").green().bold()
    ));
}
