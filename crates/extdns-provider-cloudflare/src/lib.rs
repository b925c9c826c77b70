// # Cloudflare DNS Provider
//
// This crate adapts the ExtDNS reconciliation contract to the Cloudflare
// API v4.
//
// ## Components
//
// - `types`: Cloudflare wire types (records, response envelope)
// - `client`: the `CloudflareApi` remote capability and its HTTPS client
// - `mapper`: endpoint <-> native record conversion
// - `changes`: change building and record matching (pure)
// - `provider`: the `CloudflareProvider` reconciler
//
// ## Behaviour
//
// - Every pass reads zones and records fresh; nothing is cached
// - Reads fail on the first error; writes are attempted individually and
//   failures are aggregated into one error
// - NO retry logic: the next reconciliation pass converges what failed
// - HTTP timeout of 30 seconds
// - Dry-run mode logs writes instead of sending them
//
// ## Security Requirements
//
// - API credentials NEVER appear in logs or Debug output
// - Construction fails fast if the credentials cannot be resolved to an account
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones`
// - List DNS Records: GET `/zones/:zone_id/dns_records`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`
// - Delete DNS Record: DELETE `/zones/:zone_id/dns_records/:record_id`

pub mod changes;
pub mod client;
pub mod mapper;
pub mod provider;
pub mod types;

pub use changes::{CloudflareChange, find_record_id, new_changes};
pub use client::{ApiError, CloudflareApi, HttpCloudflareClient};
pub use provider::{CloudflareOptions, CloudflareProvider, DEFAULT_ZONE_CONCURRENCY};
pub use types::{DnsRecord, RecordFilter};

use async_trait::async_trait;
use extdns_core::config::ProviderConfig;
use extdns_core::traits::{DnsProvider, DnsProviderFactory};
use extdns_core::{Error, Result};

/// Factory for creating Cloudflare providers
pub struct CloudflareFactory;

#[async_trait]
impl DnsProviderFactory for CloudflareFactory {
    async fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        match config {
            ProviderConfig::Cloudflare { .. } => {
                let provider = CloudflareProvider::from_config(config).await?;
                Ok(Box::new(provider))
            }
            _ => Err(Error::config("Invalid config for Cloudflare provider")),
        }
    }
}

/// Register the Cloudflare provider with a registry
///
/// # Example
///
/// ```rust
/// use extdns_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// extdns_provider_cloudflare::register(&registry);
/// assert!(registry.has_provider("cloudflare"));
/// ```
pub fn register(registry: &extdns_core::ProviderRegistry) {
    registry.register_provider("cloudflare", Box::new(CloudflareFactory));
}
