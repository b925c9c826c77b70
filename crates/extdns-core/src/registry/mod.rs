//! Plugin-based provider registry
//!
//! The registry allows DNS providers to be registered dynamically at
//! runtime, avoiding hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use extdns_core::registry::ProviderRegistry;
//!
//! let registry = ProviderRegistry::new();
//! extdns_provider_cloudflare::register(&registry);
//!
//! let provider = registry.create_provider(&config.provider).await?;
//! ```

use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::traits::{DnsProvider, DnsProviderFactory};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Provider registry for plugin-based DNS provider creation
///
/// The registry maintains a map of provider type names to factory objects,
/// allowing dynamic instantiation of providers based on configuration.
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ProviderRegistry {
    /// Registered DNS provider factories
    providers: RwLock<HashMap<String, Arc<dyn DnsProviderFactory>>>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a DNS provider factory
    ///
    /// # Parameters
    ///
    /// - `name`: Provider type name (e.g., "cloudflare")
    /// - `factory`: Factory object for creating provider instances
    pub fn register_provider(&self, name: impl Into<String>, factory: Box<dyn DnsProviderFactory>) {
        let mut providers = self
            .providers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        providers.insert(name.into(), Arc::from(factory));
    }

    /// Create a DNS provider from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn DnsProvider>)`: Created provider instance
    /// - `Err(Error)`: If the provider type is not registered or creation fails
    pub async fn create_provider(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        let provider_type = config.type_name();

        let factory = {
            let providers = self
                .providers
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            providers
                .get(provider_type)
                .cloned()
                .ok_or_else(|| Error::config(format!("Unknown provider type: {}", provider_type)))?
        };

        // Lock released before awaiting the factory
        factory.create(config).await
    }

    /// List all registered provider types
    pub fn list_providers(&self) -> Vec<String> {
        let providers = self
            .providers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        providers.keys().cloned().collect()
    }

    /// Check if a provider type is registered
    pub fn has_provider(&self, name: &str) -> bool {
        let providers = self
            .providers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        providers.contains_key(name)
    }
}
