use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::time::Duration;

use recon_common::models::LookupError;
use recon_core::enumerate;

use crate::util::{dns_context, fake_nameserver, Answer};

const TIMEOUT: Duration = Duration::from_millis(300);

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

fn zone(name: &str, _qtype: u16) -> Answer {
    match name {
        "api.example.com" => Answer::A(vec![Ipv4Addr::new(10, 1, 0, 1)]),
        "api3.example.com" => Answer::Delayed(Duration::from_millis(50), Box::new(Answer::A(vec![Ipv4Addr::new(10, 1, 0, 3)]))),
        "www7.example.com" => Answer::ServFail,
        "www9.example.com" => Answer::Silent,
        _ => Answer::NxDomain,
    }
}

#[tokio::test]
async fn every_candidate_gets_exactly_one_record() {
    let ctx = dns_context(fake_nameserver(zone).await, TIMEOUT).await;

    let mut rx = enumerate::enumerate(&ctx, "example.com", words(&["api", "www"]), true);
    let mut seen: BTreeMap<String, _> = BTreeMap::new();
    while let Some((candidate, record)) = rx.recv().await {
        assert_eq!(candidate.fqdn, record.name);
        assert!(seen.insert(candidate.fqdn, record).is_none());
    }

    assert_eq!(seen.len(), 22);
    assert!(seen["api.example.com"].is_resolved());
    assert!(seen["api3.example.com"].is_resolved());
    assert_eq!(seen["www7.example.com"].error, Some(LookupError::ServFail));
    assert_eq!(seen["www9.example.com"].error, Some(LookupError::Timeout));
    assert_eq!(seen["www.example.com"].error, Some(LookupError::NxDomain));
}

#[tokio::test]
async fn repeated_passes_find_the_same_names() {
    let ctx = dns_context(fake_nameserver(zone).await, TIMEOUT).await;

    let mut passes: Vec<Vec<String>> = Vec::new();
    for _ in 0..2 {
        let mut rx = enumerate::enumerate(&ctx, "example.com", words(&["api", "www"]), true);
        let mut found: Vec<String> = Vec::new();
        while let Some((candidate, record)) = rx.recv().await {
            if record.is_resolved() {
                found.push(candidate.fqdn);
            }
        }
        found.sort();
        passes.push(found);
    }

    assert_eq!(passes[0], vec!["api.example.com", "api3.example.com"]);
    assert_eq!(passes[0], passes[1]);
}
