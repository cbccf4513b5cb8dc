//! Wordlist-driven subdomain discovery.

use std::iter::FusedIterator;
use std::sync::Arc;

use recon_common::models::{Candidate, RecordType, ResolutionRecord};
use tokio::sync::mpsc;

use crate::context::NetworkContext;
use crate::pool;
use crate::resolver;

const NUMERIC_SUFFIXES: u8 = 10;

/// Lazy candidate sequence: for each word `w.base`, then `w0.base` to
/// `w9.base` when numeric suffixes are on. Cloning restarts nothing, it forks
/// the current position; call [`candidates`] again to start over.
#[derive(Debug, Clone)]
pub struct Candidates {
    base: Arc<str>,
    words: Arc<[String]>,
    numeric: bool,
    word: usize,
    step: u8,
}

impl Candidates {
    fn steps_per_word(&self) -> usize {
        if self.numeric {
            1 + NUMERIC_SUFFIXES as usize
        } else {
            1
        }
    }
}

impl Iterator for Candidates {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        let word: &String = self.words.get(self.word)?;
        let suffix: Option<u8> = self.step.checked_sub(1);
        let candidate = Candidate::new(word, suffix, &self.base);

        self.step += 1;
        if self.step as usize == self.steps_per_word() {
            self.word += 1;
            self.step = 0;
        }
        Some(candidate)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let total: usize = self.words.len() * self.steps_per_word();
        let done: usize = self.word * self.steps_per_word() + self.step as usize;
        let left: usize = total.saturating_sub(done);
        (left, Some(left))
    }
}

impl ExactSizeIterator for Candidates {}

impl FusedIterator for Candidates {}

pub fn candidates(base: &str, words: &[String], numeric: bool) -> Candidates {
    Candidates {
        base: Arc::from(base.trim_end_matches('.')),
        words: Arc::from(words),
        numeric,
        word: 0,
        step: 0,
    }
}

/// Resolves every candidate (A record) through the worker pool.
///
/// Results arrive in completion order, each tagged with its candidate. A
/// failed lookup is just a record with an error; the pass always covers the
/// whole list unless the receiver is dropped.
pub fn enumerate(
    ctx: &NetworkContext,
    base: &str,
    words: Vec<String>,
    numeric: bool,
) -> mpsc::Receiver<(Candidate, ResolutionRecord)> {
    let candidates: Candidates = candidates(base, &words, numeric);
    let timeout = ctx.config().timeout;
    let ctx: NetworkContext = ctx.clone();

    pool::dispatch(candidates, ctx.config().workers, move |candidate: Candidate| {
        let ctx = ctx.clone();
        async move {
            let record = resolver::resolve(&ctx, &candidate.fqdn, RecordType::A, timeout).await;
            (candidate, record)
        }
    })
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
