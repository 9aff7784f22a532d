//! Architectural Contract Test: IPv6 Gating
//!
//! This test verifies that AAAA records are left alone while IPv6 support
//! is disabled, and reconciled like A records once it is enabled.
//!
//! Constraints verified:
//! - No IPv6 resolution happens while disabled
//! - AAAA records are read but never written while disabled
//! - AAAA records follow the desired IPv6 address while enabled
//! - A failing IPv6 lookup does not affect A records
//!
//! If this test fails, disabled families are being touched.

mod common;

use common::*;
use dnsync_core::{AddressFamily, Reconciler, ReconcilerEvent};
use dnsync_core::config::RecordType;

#[tokio::test]
async fn aaaa_records_are_untouched_while_disabled() {
    let v4 = a_record("home.example.com");
    let v6 = aaaa_record("home.example.com");
    let resolver = ScriptedResolver::new(
        Some("203.0.113.9".parse().unwrap()),
        Some("2001:db8::9".parse().unwrap()),
    );
    let store = RecordingZoneStore::new();
    store.publish(&v4, "203.0.113.5");
    store.publish(&v6, "2001:db8::5");

    let (reconciler, _events) = Reconciler::new(
        resolver.clone(),
        store.clone(),
        config_for(&[v4.clone(), v6.clone()]).with_ipv6(false),
    )
    .expect("valid config");

    let outcome = reconciler.startup().await;

    assert_eq!(resolver.ipv6_calls(), 0, "no IPv6 lookup while disabled");
    assert_eq!(outcome.populate.read, 2, "AAAA records are still read");
    assert_eq!(outcome.update.written, 1);
    assert_eq!(outcome.update.skipped, 1);

    let upserts = store.upserts();
    assert_eq!(upserts.len(), 1);
    assert_eq!(upserts[0].record_type, RecordType::A);

    let snapshots = reconciler.state().snapshot().await;
    assert_eq!(snapshots[1].published, Some(ip("2001:db8::5")));
}

#[tokio::test]
async fn aaaa_records_follow_desired_address_when_enabled() {
    let v4 = a_record("home.example.com");
    let v6 = aaaa_record("home.example.com");
    let resolver = ScriptedResolver::new(
        Some("203.0.113.5".parse().unwrap()),
        Some("2001:db8::9".parse().unwrap()),
    );
    let store = RecordingZoneStore::new();
    store.publish(&v4, "203.0.113.5");
    store.publish(&v6, "2001:db8::5");

    let (reconciler, _events) = Reconciler::new(
        resolver.clone(),
        store.clone(),
        config_for(&[v4, v6]).with_ipv6(true),
    )
    .expect("valid config");

    let outcome = reconciler.startup().await;

    assert_eq!(resolver.ipv6_calls(), 1);
    assert_eq!(outcome.update.written, 1);
    assert_eq!(outcome.update.unchanged, 1);

    let upserts = store.upserts();
    assert_eq!(upserts.len(), 1);
    assert_eq!(upserts[0].record_type, RecordType::Aaaa);
    assert_eq!(upserts[0].value, ip("2001:db8::9"));
    assert_eq!(upserts[0].ttl, 600);
}

#[tokio::test]
async fn failing_ipv6_lookup_does_not_affect_a_records() {
    let v4 = a_record("home.example.com");
    let v6 = aaaa_record("home.example.com");
    let resolver = ScriptedResolver::new(Some("203.0.113.9".parse().unwrap()), None);
    let store = RecordingZoneStore::new();
    store.publish(&v4, "203.0.113.5");
    store.publish(&v6, "2001:db8::5");

    let (reconciler, mut events) = Reconciler::new(
        resolver,
        store.clone(),
        config_for(&[v4, v6]).with_ipv6(true),
    )
    .expect("valid config");

    let outcome = reconciler.startup().await;

    assert_eq!(outcome.refresh.resolved, 1);
    assert_eq!(outcome.refresh.failed, 1);
    assert_eq!(outcome.update.written, 1);
    assert_eq!(outcome.update.skipped, 1, "AAAA has no desired value yet");
    assert_eq!(store.upserts()[0].value, ip("203.0.113.9"));

    // Non-resolution errors from the resolver are reported as resolution failures
    let events = drain_events(&mut events);
    let failure = events
        .iter()
        .find_map(|e| match e {
            ReconcilerEvent::ResolutionFailed { family, error } => Some((*family, error.clone())),
            _ => None,
        })
        .expect("resolution failure reported");
    assert_eq!(failure.0, AddressFamily::V6);
    assert!(failure.1.contains("IPv6"), "unexpected error text: {}", failure.1);
}
