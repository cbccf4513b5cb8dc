use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::Path;
use std::time::{Duration, Instant};

use colored::*;
use recon_common::error::StartupError;
use recon_common::models::{Candidate, RecordType, ResolutionRecord};
use recon_common::wordlist;
use recon_core::{NetworkContext, enumerate, pool, resolver};
use tracing::{Instrument, debug, info, info_span, warn};

use crate::commands::DnsArgs;
use crate::mprint;
use crate::terminal::{colors, format, print, spinner};

/// Resolved name and the PTR names of each of its addresses.
struct Finding {
    name: String,
    addrs: Vec<IpAddr>,
    ptr: BTreeMap<IpAddr, Vec<String>>,
}

pub async fn dns(args: DnsArgs, quiet: u8) -> anyhow::Result<()> {
    let domain: String = args
        .domain
        .domain()
        .ok_or_else(|| StartupError::input(format!("{} is an address, not a domain", args.domain)))?
        .to_string();
    let words: Vec<String> = match &args.wordlist {
        Some(path) => load_wordlist(path)?,
        None => Vec::new(),
    };

    let ctx = NetworkContext::open(args.config(), false).await?;
    info!("Resolving through {}", ctx.nameserver());
    let start_time: Instant = Instant::now();

    let root: Finding = resolve_root(&ctx, &domain).await;
    print_root(&root, quiet);

    if words.is_empty() {
        return Ok(());
    }

    let (mut findings, tried) = brute_force(&ctx, &domain, words, args.numeric).await;
    attach_ptr(&ctx, &mut findings).await;
    print_findings(&domain, &findings, quiet);
    print_summary(findings.len(), tried, start_time.elapsed(), quiet);
    Ok(())
}

fn load_wordlist(path: &Path) -> Result<Vec<String>, StartupError> {
    let contents: String = std::fs::read_to_string(path)
        .map_err(|e| StartupError::input(format!("cannot read wordlist {}: {e}", path.display())))?;
    let mut words: Vec<String> = wordlist::parse(&contents);

    let invalid: Vec<String> = wordlist::invalid_words(&words)
        .into_iter()
        .map(str::to_string)
        .collect();
    if !invalid.is_empty() {
        warn!("Skipping {} invalid words: {}", invalid.len(), invalid.join(", "));
        words.retain(|word| !invalid.contains(word));
    }
    debug!("Loaded {} words from {}", words.len(), path.display());
    Ok(words)
}

/// The root domain is always looked up first, A and AAAA, plus PTR for
/// every address it has.
async fn resolve_root(ctx: &NetworkContext, domain: &str) -> Finding {
    let timeout: Duration = ctx.config().timeout;
    let (a, aaaa) = tokio::join!(
        resolver::resolve(ctx, domain, RecordType::A, timeout),
        resolver::resolve(ctx, domain, RecordType::Aaaa, timeout),
    );
    for record in [&a, &aaaa] {
        if let Some(e) = &record.error {
            warn!("{} lookup for {domain} failed: {e}", record.record_type);
        }
    }

    let addrs: Vec<IpAddr> = a.addresses().chain(aaaa.addresses()).collect();
    let mut finding = Finding {
        name: domain.to_string(),
        addrs,
        ptr: BTreeMap::new(),
    };
    attach_ptr(ctx, std::slice::from_mut(&mut finding)).await;
    finding
}

async fn brute_force(
    ctx: &NetworkContext,
    domain: &str,
    words: Vec<String>,
    numeric: bool,
) -> (Vec<Finding>, usize) {
    let total: usize = enumerate::candidates(domain, &words, numeric).len();
    let span = info_span!("enumeration", indicatif.pb_show = true);
    spinner::start_progress(&span, &format!("Enumerating {domain}"), total);

    let progress = span.clone();
    let findings: Vec<Finding> = async move {
        let mut rx = enumerate::enumerate(ctx, domain, words, numeric);
        let mut findings: Vec<Finding> = Vec::new();
        while let Some((candidate, record)) = rx.recv().await {
            if let Some(finding) = to_finding(&candidate, &record) {
                findings.push(finding);
            }
            spinner::advance(&progress, findings.len());
        }
        findings
    }
    .instrument(span)
    .await;

    (findings, total)
}

fn to_finding(candidate: &Candidate, record: &ResolutionRecord) -> Option<Finding> {
    match &record.error {
        Some(e) => {
            debug!("{candidate}: {e}");
            None
        }
        None if record.values.is_empty() => {
            debug!("{candidate}: no A record");
            None
        }
        None => {
            info!("Found {}", candidate.fqdn.bold());
            Some(Finding {
                name: candidate.fqdn.clone(),
                addrs: record.addresses().collect(),
                ptr: BTreeMap::new(),
            })
        }
    }
}

/// Reverse-resolves every distinct address once, through the worker pool.
async fn attach_ptr(ctx: &NetworkContext, findings: &mut [Finding]) {
    let mut addrs: Vec<IpAddr> = findings.iter().flat_map(|f| f.addrs.iter().copied()).collect();
    addrs.sort_unstable();
    addrs.dedup();

    let timeout: Duration = ctx.config().timeout;
    let task_ctx: NetworkContext = ctx.clone();
    let rx = pool::dispatch(addrs, ctx.config().workers, move |addr| {
        let ctx = task_ctx.clone();
        async move { (addr, resolver::reverse_resolve(&ctx, addr, timeout).await) }
    });

    let mut names: BTreeMap<IpAddr, Vec<String>> = BTreeMap::new();
    for (addr, record) in pool::collect(rx).await {
        match &record.error {
            Some(e) => debug!("PTR for {addr} failed: {e}"),
            None => {
                names.insert(addr, record.names().map(str::to_string).collect());
            }
        }
    }

    for finding in findings.iter_mut() {
        finding.ptr = finding
            .addrs
            .iter()
            .filter_map(|addr| names.get(addr).map(|n| (*addr, n.clone())))
            .collect();
    }
}

fn finding_details(finding: &Finding) -> Vec<(String, ColoredString)> {
    let mut details: Vec<(String, ColoredString)> = format::ip_to_key_value_pair(&finding.addrs);
    for (addr, names) in &finding.ptr {
        for name in names {
            let value: String = format!(
                "{} {}",
                name.color(colors::HOSTNAME),
                format!("({addr})").color(colors::SEPARATOR)
            );
            details.push(("PTR".to_string(), value.normal()));
        }
    }
    details
}

fn print_root(root: &Finding, quiet: u8) {
    print::header(&format!("dns of {}", root.name), quiet);
    if root.addrs.is_empty() {
        print::no_results("addresses");
        return;
    }
    if quiet > 1 {
        for addr in &root.addrs {
            mprint!(&format!("{} {addr}", root.name));
        }
        return;
    }
    print::tree_head(0, &root.name);
    print::as_tree_one_level(finding_details(root));
}

fn print_findings(domain: &str, findings: &[Finding], quiet: u8) {
    print::header(&format!("subdomains of {domain}"), quiet);
    if findings.is_empty() {
        print::no_results("subdomains");
        return;
    }

    let mut sorted: Vec<&Finding> = findings.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    for (idx, finding) in sorted.iter().enumerate() {
        if quiet > 1 {
            let addrs: Vec<String> = finding.addrs.iter().map(IpAddr::to_string).collect();
            mprint!(&format!("{} {}", finding.name, addrs.join(",")));
            continue;
        }
        print::tree_head(idx, &finding.name);
        print::as_tree_one_level(finding_details(finding));
        if idx + 1 != sorted.len() {
            mprint!();
        }
    }
}

fn print_summary(found: usize, tried: usize, total_time: Duration, quiet: u8) {
    if quiet > 1 {
        return;
    }
    let found: ColoredString = format!("{found} names").bold().green();
    let tried: ColoredString = format!("{tried} candidates").color(colors::TEXT_DEFAULT);
    let total_time: ColoredString = format!("{:.2}s", total_time.as_secs_f64()).bold().yellow();

    print::fat_separator();
    print::centerln(&format!("Enumeration Complete: {found} out of {tried} in {total_time}"));
}
