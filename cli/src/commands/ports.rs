use std::net::IpAddr;
use std::time::{Duration, Instant};

use anyhow::Context;
use colored::*;
use recon_common::models::{ProbeResult, Verdict};
use recon_core::scanner::{self, dns};
use recon_core::{NetworkContext, resolve_target};
use tracing::{Instrument, info_span, warn};

use crate::commands::PortsArgs;
use crate::mprint;
use crate::terminal::{colors, format, print, spinner};

struct HostReport {
    addr: IpAddr,
    results: Vec<ProbeResult>,
    dns_service: bool,
}

pub async fn ports(args: PortsArgs, quiet: u8) -> anyhow::Result<()> {
    let ports: Vec<u16> = if args.ports.is_empty() {
        scanner::WELL_KNOWN_PORTS.to_vec()
    } else {
        args.ports.clone()
    };

    let ctx = NetworkContext::open(args.config(), true)
        .await
        .context("opening raw sockets")?;
    let addrs: Vec<IpAddr> = resolve_target(&ctx, &args.target).await?;

    let start_time: Instant = Instant::now();
    let mut reports: Vec<HostReport> = Vec::with_capacity(addrs.len());
    for addr in addrs {
        let span = info_span!("probing", indicatif.pb_show = true);
        spinner::start_spinner(&span, &format!("Probing {} ports on {addr}", ports.len()));

        let (results, dns_service) = async {
            let results = scanner::probe_ports(&ctx, addr, &ports, args.timeout).await;
            let dns_service: bool = dns::probe_dns_service(&ctx, addr, args.timeout).await;
            (results, dns_service)
        }
        .instrument(span)
        .await;
        let results: Vec<ProbeResult> = results?;
        reports.push(HostReport {
            addr,
            results,
            dns_service,
        });
    }

    let local_failures: usize = ctx.syn_engine().map_or(0, |engine| engine.local_failures());
    if local_failures > 0 {
        warn!("{local_failures} probes never left this host and are counted as filtered");
    }

    ctx.shutdown().await;
    print_reports(&args.target.to_string(), &reports, quiet);
    print_summary(&reports, local_failures, start_time.elapsed(), quiet);
    Ok(())
}

fn print_reports(target: &str, reports: &[HostReport], quiet: u8) {
    print::header(&format!("ports of {target}"), quiet);

    for (idx, report) in reports.iter().enumerate() {
        let open: Vec<&ProbeResult> = report.results.iter().filter(|r| r.is_open()).collect();
        if quiet > 1 {
            for result in open {
                mprint!(&format!("{}:{}", report.addr, result.port));
            }
            continue;
        }

        print::tree_head(idx, &report.addr.to_string());
        let mut details: Vec<(String, ColoredString)> = report
            .results
            .iter()
            .filter(|result| quiet == 0 || result.is_open())
            .map(format::port_to_detail)
            .collect();
        let dns_state: ColoredString = if report.dns_service {
            "answers".color(colors::OPEN).bold()
        } else {
            "silent".color(colors::NO_RESPONSE)
        };
        details.push(("53/udp".to_string(), dns_state));
        print::as_tree_one_level(details);

        if open.is_empty() {
            warn!("No open port on {}", report.addr);
        }
        if idx + 1 != reports.len() {
            mprint!();
        }
    }
}

fn print_summary(reports: &[HostReport], local_failures: usize, total_time: Duration, quiet: u8) {
    if quiet > 1 {
        return;
    }
    let count = |verdict: Verdict| -> usize {
        reports
            .iter()
            .flat_map(|report| &report.results)
            .filter(|result| result.verdict == verdict)
            .count()
    };

    let open: ColoredString = format!("{} open", count(Verdict::Open)).bold().green();
    let closed: ColoredString = format!("{} closed", count(Verdict::Closed)).color(colors::CLOSED);
    let filtered: ColoredString =
        format!("{} filtered", count(Verdict::Filtered) + count(Verdict::NoResponse))
            .color(colors::FILTERED);
    let total_time: ColoredString = format!("{:.2}s", total_time.as_secs_f64()).bold().yellow();

    print::fat_separator();
    print::centerln(&format!("{open}, {closed}, {filtered} in {total_time}"));
    if local_failures > 0 {
        print::centerln(&format!("({local_failures} of the filtered failed locally)").dimmed().to_string());
    }
}
