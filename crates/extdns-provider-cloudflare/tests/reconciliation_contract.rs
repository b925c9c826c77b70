//! Contract Test: End-to-End Reconciliation
//!
//! Drives the controller against the Cloudflare provider backed by the fake
//! client.
//!
//! Constraints verified:
//! - One pass converges the remote state to the desired state
//! - A second pass over converged state issues no write (idempotence)

mod common;

use common::*;
use extdns_core::{Controller, ControllerConfig, Endpoint, Policy, StaticSource};
use extdns_provider_cloudflare::CloudflareOptions;
use std::sync::Arc;

#[tokio::test]
async fn converges_then_stays_quiet() {
    let api = Arc::new(
        FakeCloudflareApi::new()
            .with_zone("1", "example.com")
            .with_record("1", "ns", "example.com", "NS", "ns1.cloudflare.com")
            .with_record("1", "10", "www.example.com", "A", "198.51.100.1")
            .with_record("1", "11", "stale.example.com", "A", "198.51.100.2"),
    );
    let provider = connect(&api, CloudflareOptions::default()).await;

    let source = StaticSource::new(vec![
        Endpoint::new("www.example.com", "198.51.100.9"),
        Endpoint::new("api.example.com", "lb.example.net"),
    ]);
    let config = ControllerConfig {
        policy: Policy::Sync,
        ..Default::default()
    };
    let (controller, _events) =
        Controller::new(Box::new(source), Box::new(provider), &config).expect("controller");

    let first = controller.run_once().await.expect("first pass");
    assert_eq!(first.create.len(), 1);
    assert_eq!(first.update_count(), 1);
    assert_eq!(first.delete.len(), 1);

    let mut remote: Vec<(String, String, String)> = api
        .records_in("1")
        .into_iter()
        .map(|r| (r.name, r.record_type, r.content))
        .collect();
    remote.sort();
    assert_eq!(
        remote,
        vec![
            ("api.example.com".into(), "CNAME".into(), "lb.example.net".into()),
            ("example.com".into(), "NS".into(), "ns1.cloudflare.com".into()),
            ("www.example.com".into(), "A".into(), "198.51.100.9".into()),
        ]
    );

    api.clear_calls();
    let second = controller.run_once().await.expect("second pass");

    assert!(second.is_empty());
    assert!(api.writes().is_empty(), "converged state must not be rewritten");
}

#[tokio::test]
async fn upsert_only_keeps_unknown_records() {
    let api = Arc::new(
        FakeCloudflareApi::new()
            .with_zone("1", "example.com")
            .with_record("1", "11", "manual.example.com", "A", "198.51.100.2"),
    );
    let provider = connect(&api, CloudflareOptions::default()).await;

    let source = StaticSource::new(vec![Endpoint::new("www.example.com", "198.51.100.9")]);
    let (controller, _events) = Controller::new(
        Box::new(source),
        Box::new(provider),
        &ControllerConfig::default(),
    )
    .expect("controller");

    controller.run_once().await.expect("pass");

    assert_eq!(api.count(|c| matches!(c, Call::Delete { .. })), 0);
    assert_eq!(api.records_in("1").len(), 2);
}
