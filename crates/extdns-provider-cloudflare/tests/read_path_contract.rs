//! Contract Test: Read Path
//!
//! Constraints verified:
//! - Construction resolves the account identity or fails with an
//!   authentication error
//! - Zones outside the domain filter are never returned
//! - Only managed record types are mapped to endpoints
//! - Any listing failure aborts the whole read; no partial snapshot

mod common;

use common::*;
use extdns_core::{DnsProvider, Endpoint, Error};
use extdns_provider_cloudflare::{CloudflareApi, CloudflareOptions, CloudflareProvider};
use std::sync::Arc;

#[tokio::test]
async fn connect_resolves_account() {
    let api = Arc::new(FakeCloudflareApi::new());
    let provider = connect(&api, CloudflareOptions::default()).await;

    assert_eq!(provider.account_id(), "account-1");
    assert_eq!(api.calls(), vec![Call::AccountIdentity]);
}

#[tokio::test]
async fn connect_fails_fast_on_bad_credentials() {
    let api = Arc::new(FakeCloudflareApi::new().with_zone("1", "example.com").failing_identity());
    let client: Arc<dyn CloudflareApi> = api.clone();

    let err = CloudflareProvider::connect(client, CloudflareOptions::default())
        .await
        .expect_err("connect fails");

    assert!(matches!(err, Error::Authentication(_)));
    assert_eq!(api.calls(), vec![Call::AccountIdentity], "nothing else is attempted");
}

#[tokio::test]
async fn zones_respect_domain_filter() {
    let api = Arc::new(
        FakeCloudflareApi::new()
            .with_zone("1", "ext-dns-test.zalando.to.")
            .with_zone("2", "foo.com."),
    );
    let provider = connect(&api, filtered("zalando.to.")).await;

    let zones = provider.zones().await.expect("zones listed");

    assert_eq!(zones.len(), 1);
    assert_eq!(zones[0].id, "1");
    assert_eq!(zones[0].name, "ext-dns-test.zalando.to.");
}

#[tokio::test]
async fn empty_filter_returns_every_zone() {
    let api = Arc::new(
        FakeCloudflareApi::new()
            .with_zone("1", "ext-dns-test.zalando.to.")
            .with_zone("2", "foo.com."),
    );
    let provider = connect(&api, CloudflareOptions::default()).await;

    assert_eq!(provider.zones().await.expect("zones listed").len(), 2);
}

#[tokio::test]
async fn filter_matches_on_label_boundary() {
    let api = Arc::new(
        FakeCloudflareApi::new()
            .with_zone("1", "zalando.to")
            .with_zone("2", "notzalando.to"),
    );
    let provider = connect(&api, filtered("zalando.to")).await;

    let zones = provider.zones().await.expect("zones listed");
    assert_eq!(zones.iter().map(|z| z.id.as_str()).collect::<Vec<_>>(), vec!["1"]);
}

#[tokio::test]
async fn zone_listing_failure_is_a_remote_list_error() {
    let api = Arc::new(FakeCloudflareApi::new().failing_list_zones());
    let provider = connect(&api, CloudflareOptions::default()).await;

    assert!(matches!(provider.zones().await, Err(Error::RemoteList(_))));
    assert!(matches!(provider.records().await, Err(Error::RemoteList(_))));
}

#[tokio::test]
async fn records_skip_untyped_records() {
    let api = Arc::new(
        FakeCloudflareApi::new()
            .with_zone("1", "ext-dns-test.zalando.to.")
            .with_record("1", "11", "foobar.ext-dns-test.zalando.to.", "A", "1.2.3.4")
            .with_record("1", "12", "foo.bar.com", "", ""),
    );
    let provider = connect(&api, CloudflareOptions::default()).await;

    let endpoints = provider.records().await.expect("records listed");

    assert_eq!(
        endpoints,
        vec![Endpoint::new("foobar.ext-dns-test.zalando.to", "1.2.3.4")]
    );
}

#[tokio::test]
async fn records_skip_apex_ns_and_soa() {
    let api = Arc::new(
        FakeCloudflareApi::new()
            .with_zone("1", "example.com")
            .with_record("1", "1", "example.com", "NS", "ns1.cloudflare.com")
            .with_record("1", "2", "example.com", "SOA", "ns1.cloudflare.com")
            .with_record("1", "3", "example.com", "MX", "mail.example.com")
            .with_record("1", "4", "www.example.com", "CNAME", "example.com")
            .with_record("1", "5", "example.com", "TXT", "v=spf1 -all"),
    );
    let provider = connect(&api, CloudflareOptions::default()).await;

    let endpoints = provider.records().await.expect("records listed");

    assert_eq!(endpoints.len(), 2);
    assert_eq!(endpoints[0].dns_name, "www.example.com");
    assert_eq!(endpoints[1].target, "v=spf1 -all");
}

#[tokio::test]
async fn records_span_every_zone_in_scope() {
    let api = Arc::new(
        FakeCloudflareApi::new()
            .with_zone("1", "example.com")
            .with_zone("2", "example.org")
            .with_zone("3", "other.net")
            .with_record("1", "a", "www.example.com", "A", "198.51.100.1")
            .with_record("2", "b", "www.example.org", "AAAA", "2001:db8::1")
            .with_record("3", "c", "www.other.net", "A", "198.51.100.3"),
    );
    let provider = connect(
        &api,
        CloudflareOptions {
            domain_filter: "example.com".into(),
            ..Default::default()
        },
    )
    .await;

    let endpoints = provider.records().await.expect("records listed");

    assert_eq!(endpoints, vec![Endpoint::new("www.example.com", "198.51.100.1")]);
    assert_eq!(
        api.count(|c| matches!(c, Call::ListRecords { .. })),
        1,
        "zones outside the filter are not read"
    );
}

#[tokio::test]
async fn one_failing_zone_aborts_records() {
    let api = Arc::new(
        FakeCloudflareApi::new()
            .with_zone("1", "example.com")
            .with_zone("2", "example.org")
            .with_record("1", "a", "www.example.com", "A", "198.51.100.1")
            .failing_list_records("2"),
    );
    let provider = connect(&api, CloudflareOptions::default()).await;

    let err = provider.records().await.expect_err("records fail");

    assert!(matches!(err, Error::RemoteList(_)));
    assert!(err.to_string().contains("example.org"));
}
