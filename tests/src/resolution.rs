use std::net::{IpAddr, Ipv4Addr};
use std::time::{Duration, Instant};

use recon_common::models::{LookupError, RecordData, RecordType};
use recon_common::network::target::Target;
use recon_core::{resolve_target, resolver};

use crate::util::{dns_context, fake_nameserver, Answer};

const TIMEOUT: Duration = Duration::from_millis(500);

fn zone(name: &str, qtype: u16) -> Answer {
    match (name, qtype) {
        ("www.example.com", 1) => Answer::A(vec![Ipv4Addr::new(192, 0, 2, 10), Ipv4Addr::new(192, 0, 2, 11)]),
        ("empty.example.com", _) => Answer::A(vec![]),
        ("broken.example.com", _) => Answer::ServFail,
        ("blocked.example.com", _) => Answer::Refused,
        ("slow.example.com", _) => Answer::Silent,
        ("10.2.0.192.in-addr.arpa", 12) => Answer::Ptr(vec!["web.example.com".into()]),
        _ => Answer::NxDomain,
    }
}

#[tokio::test]
async fn addresses_come_back_in_answer_order() {
    let ctx = dns_context(fake_nameserver(zone).await, TIMEOUT).await;
    let record = resolver::resolve(&ctx, "www.example.com", RecordType::A, TIMEOUT).await;

    assert_eq!(record.error, None);
    assert_eq!(
        record.addresses().collect::<Vec<_>>(),
        vec![
            IpAddr::V4(Ipv4Addr::new(192, 0, 2, 10)),
            IpAddr::V4(Ipv4Addr::new(192, 0, 2, 11))
        ]
    );
}

#[tokio::test]
async fn failure_kinds_stay_distinct() {
    let ctx = dns_context(fake_nameserver(zone).await, TIMEOUT).await;

    let nx = resolver::resolve(&ctx, "missing.example.com", RecordType::A, TIMEOUT).await;
    let servfail = resolver::resolve(&ctx, "broken.example.com", RecordType::A, TIMEOUT).await;
    let refused = resolver::resolve(&ctx, "blocked.example.com", RecordType::A, TIMEOUT).await;
    let empty = resolver::resolve(&ctx, "empty.example.com", RecordType::A, TIMEOUT).await;

    assert_eq!(nx.error, Some(LookupError::NxDomain));
    assert_eq!(servfail.error, Some(LookupError::ServFail));
    assert!(matches!(refused.error, Some(LookupError::Other(_))));
    assert!(empty.is_empty());
    assert_eq!(empty.error, None);
}

#[tokio::test]
async fn silence_is_a_timeout() {
    let ctx = dns_context(fake_nameserver(zone).await, TIMEOUT).await;
    let timeout = Duration::from_millis(150);

    let started = Instant::now();
    let record = resolver::resolve(&ctx, "slow.example.com", RecordType::A, timeout).await;

    assert_eq!(record.error, Some(LookupError::Timeout));
    assert!(started.elapsed() >= timeout);
    assert!(started.elapsed() < timeout + Duration::from_millis(500));
}

#[tokio::test]
async fn ptr_names_are_returned() {
    let ctx = dns_context(fake_nameserver(zone).await, TIMEOUT).await;
    let addr = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 10));

    let record = resolver::reverse_resolve(&ctx, addr, TIMEOUT).await;

    assert_eq!(record.name, "10.2.0.192.in-addr.arpa");
    assert_eq!(record.values, vec![RecordData::Name("web.example.com".into())]);
}

#[tokio::test]
async fn missing_ptr_is_empty_not_an_error() {
    let ctx = dns_context(fake_nameserver(zone).await, TIMEOUT).await;
    let addr = IpAddr::V4(Ipv4Addr::new(198, 51, 100, 7));

    let record = resolver::reverse_resolve(&ctx, addr, TIMEOUT).await;

    assert_eq!(record.record_type, RecordType::Ptr);
    assert_eq!(record.error, None);
    assert!(record.values.is_empty());
}

#[tokio::test]
async fn concurrent_lookups_get_their_own_answers() {
    let ctx = dns_context(
        fake_nameserver(|name, _| match name {
            "a.example.com" => Answer::Delayed(Duration::from_millis(120), Box::new(Answer::A(vec![Ipv4Addr::new(10, 0, 0, 1)]))),
            "b.example.com" => Answer::Delayed(Duration::from_millis(60), Box::new(Answer::A(vec![Ipv4Addr::new(10, 0, 0, 2)]))),
            "c.example.com" => Answer::A(vec![Ipv4Addr::new(10, 0, 0, 3)]),
            _ => Answer::NxDomain,
        })
        .await,
        TIMEOUT,
    )
    .await;

    let (a, b, c) = tokio::join!(
        resolver::resolve(&ctx, "a.example.com", RecordType::A, TIMEOUT),
        resolver::resolve(&ctx, "b.example.com", RecordType::A, TIMEOUT),
        resolver::resolve(&ctx, "c.example.com", RecordType::A, TIMEOUT),
    );

    assert_eq!(a.addresses().collect::<Vec<_>>(), vec![IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))]);
    assert_eq!(b.addresses().collect::<Vec<_>>(), vec![IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2))]);
    assert_eq!(c.addresses().collect::<Vec<_>>(), vec![IpAddr::V4(Ipv4Addr::new(10, 0, 0, 3))]);
}

#[tokio::test]
async fn targets_resolve_to_addresses() {
    let ctx = dns_context(fake_nameserver(zone).await, TIMEOUT).await;

    let literal: Target = "203.0.113.9".parse().unwrap();
    assert_eq!(
        resolve_target(&ctx, &literal).await.unwrap(),
        vec![IpAddr::V4(Ipv4Addr::new(203, 0, 113, 9))]
    );

    let named: Target = "www.example.com".parse().unwrap();
    assert_eq!(resolve_target(&ctx, &named).await.unwrap().len(), 2);

    let missing: Target = "missing.example.com".parse().unwrap();
    assert!(resolve_target(&ctx, &missing).await.is_err());
}
