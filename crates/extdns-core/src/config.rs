//! Configuration types for the ExtDNS system
//!
//! This module defines all configuration structures used throughout the crate.
//! Nothing here reads the environment; the daemon builds these structs at
//! its boundary and hands them to the core.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain_filter::DomainFilter;
use crate::endpoint::{Endpoint, RecordType};
use crate::plan::Policy;

/// Main ExtDNS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtDnsConfig {
    /// DNS provider configuration
    pub provider: ProviderConfig,

    /// Desired-state source configuration
    #[serde(default)]
    pub source: SourceConfig,

    /// Optional controller settings
    #[serde(default)]
    pub controller: ControllerConfig,
}

impl ExtDnsConfig {
    /// Create a configuration with defaults for everything but the provider
    pub fn new(provider: ProviderConfig) -> Self {
        Self {
            provider,
            source: SourceConfig::default(),
            controller: ControllerConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.provider.validate()?;
        self.source.validate()?;
        self.controller.validate()?;
        Ok(())
    }
}

/// Credentials for the Cloudflare API
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CloudflareAuth {
    /// Global API key plus account email
    ApiKey {
        /// API key
        key: String,
        /// Account email
        email: String,
    },

    /// Scoped API token
    ApiToken {
        /// Bearer token
        token: String,
    },
}

impl CloudflareAuth {
    pub fn api_key(key: impl Into<String>, email: impl Into<String>) -> Self {
        Self::ApiKey {
            key: key.into(),
            email: email.into(),
        }
    }

    pub fn api_token(token: impl Into<String>) -> Self {
        Self::ApiToken {
            token: token.into(),
        }
    }

    /// Validate that no credential part is empty
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            CloudflareAuth::ApiKey { key, email } => {
                if key.trim().is_empty() {
                    return Err(crate::Error::config("Cloudflare API key cannot be empty"));
                }
                if email.trim().is_empty() {
                    return Err(crate::Error::config("Cloudflare API email cannot be empty"));
                }
                Ok(())
            }
            CloudflareAuth::ApiToken { token } => {
                if token.trim().is_empty() {
                    return Err(crate::Error::config("Cloudflare API token cannot be empty"));
                }
                Ok(())
            }
        }
    }
}

// Credentials never show up in logs
impl fmt::Debug for CloudflareAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloudflareAuth::ApiKey { email, .. } => f
                .debug_struct("ApiKey")
                .field("key", &"<REDACTED>")
                .field("email", email)
                .finish(),
            CloudflareAuth::ApiToken { .. } => f
                .debug_struct("ApiToken")
                .field("token", &"<REDACTED>")
                .finish(),
        }
    }
}

/// DNS provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Cloudflare provider
    Cloudflare {
        /// API credentials
        auth: CloudflareAuth,
        /// Only zones and hostnames under this suffix are managed
        #[serde(default)]
        domain_filter: DomainFilter,
        /// Route created records through the Cloudflare edge
        #[serde(default)]
        proxied: bool,
        /// Log intended writes instead of performing them
        #[serde(default)]
        dry_run: bool,
        /// Maximum number of zones written concurrently
        #[serde(default = "default_zone_concurrency")]
        zone_concurrency: usize,
    },

    /// Custom provider
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl ProviderConfig {
    /// Cloudflare configuration with default options
    pub fn cloudflare(auth: CloudflareAuth) -> Self {
        ProviderConfig::Cloudflare {
            auth,
            domain_filter: DomainFilter::any(),
            proxied: false,
            dry_run: false,
            zone_concurrency: default_zone_concurrency(),
        }
    }

    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Cloudflare {
                auth,
                zone_concurrency,
                ..
            } => {
                auth.validate()?;
                if *zone_concurrency == 0 {
                    return Err(crate::Error::config(
                        "Cloudflare zone concurrency must be > 0",
                    ));
                }
                Ok(())
            }
            ProviderConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom provider factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom provider config cannot be null",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Cloudflare { .. } => "cloudflare",
            ProviderConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Desired-state source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Fixed list of endpoints
    Static {
        /// Endpoints to keep in place
        #[serde(default)]
        endpoints: Vec<EndpointConfig>,
    },
}

impl SourceConfig {
    /// Validate the source configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            SourceConfig::Static { endpoints } => {
                for endpoint in endpoints {
                    endpoint.to_endpoint()?;
                }
                Ok(())
            }
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Static {
            endpoints: Vec::new(),
        }
    }
}

/// One configured desired endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Hostname (e.g., "www.example.com")
    pub dns_name: String,

    /// Record value
    pub target: String,

    /// Record type; inferred from the target when absent
    #[serde(default)]
    pub record_type: Option<RecordType>,
}

impl EndpointConfig {
    pub fn new(dns_name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            dns_name: dns_name.into(),
            target: target.into(),
            record_type: None,
        }
    }

    /// Set the record type explicitly
    pub fn with_record_type(mut self, record_type: RecordType) -> Self {
        self.record_type = Some(record_type);
        self
    }

    /// Convert into an endpoint, rejecting empty names or targets
    pub fn to_endpoint(&self) -> Result<Endpoint, crate::Error> {
        if self.dns_name.trim().trim_end_matches('.').is_empty() {
            return Err(crate::Error::config("Endpoint DNS name cannot be empty"));
        }
        if self.target.trim().is_empty() {
            return Err(crate::Error::config(format!(
                "Endpoint {} has an empty target",
                self.dns_name
            )));
        }

        Ok(match self.record_type {
            Some(record_type) => Endpoint::with_type(&self.dns_name, &self.target, record_type),
            None => Endpoint::new(&self.dns_name, &self.target),
        })
    }
}

/// Controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Interval between reconciliation passes (in seconds)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Which kinds of changes the plan may produce
    #[serde(default)]
    pub policy: Policy,

    /// Run a single pass and exit
    #[serde(default)]
    pub once: bool,

    /// Capacity of the controller event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl ControllerConfig {
    /// Validate the controller configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.interval_secs == 0 {
            return Err(crate::Error::config("Controller interval must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config(
                "Controller event channel capacity must be > 0",
            ));
        }
        Ok(())
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            policy: Policy::default(),
            once: false,
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_zone_concurrency() -> usize {
    4
}

fn default_interval_secs() -> u64 {
    60
}

fn default_event_channel_capacity() -> usize {
    100
}
