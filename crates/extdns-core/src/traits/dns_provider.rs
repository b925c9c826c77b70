// # DNS Provider Trait
//
// Defines the reconciliation contract every DNS backend implements.
//
// ## Implementations
//
// - Cloudflare: `extdns-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use extdns_core::{DnsProvider, Plan, Policy};
//
// async fn pass(provider: &dyn DnsProvider, desired: Vec<Endpoint>) -> extdns_core::Result<()> {
//     let current = provider.records().await?;
//     let changes = Plan::new(current, desired, Policy::Sync).calculate();
//     provider.apply_changes(&changes).await
// }
// ```

use async_trait::async_trait;

use crate::endpoint::Endpoint;
use crate::plan::Changes;
use crate::zone::Zone;

/// Trait for DNS provider implementations
///
/// A provider adapts the generic endpoint model to one remote DNS API.
/// Every call reads fresh state from the remote service; providers keep no
/// zone or record cache between calls.
///
/// # Error policy
///
/// - `zones()` and `records()` are fail-fast: any listing error aborts the
///   call and no partial snapshot is returned.
/// - `apply_changes()` is fail-soft: every write is attempted and all
///   failures are returned together as [`crate::Error::Apply`].
///
/// Providers never retry. The next reconciliation pass re-lists and
/// re-diffs from scratch.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List the zones this provider instance may manage
    ///
    /// Zones outside the configured domain filter are excluded.
    async fn zones(&self) -> Result<Vec<Zone>, crate::Error>;

    /// List the current records of every managed zone as endpoints
    ///
    /// Record types the generic model does not manage (NS, SOA, ...) are
    /// skipped.
    async fn records(&self) -> Result<Vec<Endpoint>, crate::Error>;

    /// Apply a change set
    ///
    /// Empty changes must succeed without any remote call.
    async fn apply_changes(&self, changes: &Changes) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    ///
    /// # Returns
    ///
    /// A static string identifying the provider (e.g., "cloudflare")
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing DNS providers from configuration
///
/// Construction is async because providers resolve the account identity
/// up front; bad credentials fail here with
/// [`crate::Error::Authentication`].
#[async_trait]
pub trait DnsProviderFactory: Send + Sync {
    /// Create a DnsProvider instance from configuration
    async fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Box<dyn DnsProvider>, crate::Error>;
}
