//! Error types for the ExtDNS system
//!
//! Read-phase failures (`Authentication`, `RemoteList`) abort the current
//! call. Write-phase failures are collected into an [`ApplyError`] so a
//! single pass reports every record that did not converge.

use std::fmt;
use thiserror::Error;

use crate::plan::ChangeAction;

/// Result type alias for ExtDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the ExtDNS system
#[derive(Error, Debug)]
pub enum Error {
    /// Account identity could not be resolved (missing or invalid credentials)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Listing zones or records failed; the snapshot is unusable
    #[error("Failed to list remote state: {0}")]
    RemoteList(String),

    /// A hostname is not owned by any zone of the account
    #[error("No zone found for hostname {hostname}")]
    ZoneRouting {
        /// The hostname that could not be routed
        hostname: String,
    },

    /// One or more remote writes failed during `apply_changes`
    #[error(transparent)]
    Apply(#[from] ApplyError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input (e.g. an update pair that renames a record)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP client errors (from provider APIs)
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Record or zone not found on the remote side
    #[error("Not found: {0}")]
    NotFound(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a remote listing error
    pub fn remote_list(msg: impl Into<String>) -> Self {
        Self::RemoteList(msg.into())
    }

    /// Create a zone routing error
    pub fn zone_routing(hostname: impl Into<String>) -> Self {
        Self::ZoneRouting {
            hostname: hostname.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// The aggregated write failures, if this is an apply error
    pub fn write_failures(&self) -> &[WriteFailure] {
        match self {
            Self::Apply(apply) => &apply.failures,
            _ => &[],
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

/// A single remote write that failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFailure {
    /// Name of the zone the write was routed to
    pub zone: String,
    /// The attempted action
    pub action: ChangeAction,
    /// Record name
    pub record: String,
    /// Record type as sent to the provider
    pub record_type: String,
    /// Error reported by the remote client
    pub message: String,
}

impl fmt::Display for WriteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[zone {}] {} {} {}: {}",
            self.zone, self.action, self.record, self.record_type, self.message
        )
    }
}

/// Aggregate of every write failure of one `apply_changes` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyError {
    /// Failures in the order they were observed (zone order, then batch order)
    pub failures: Vec<WriteFailure>,
}

impl ApplyError {
    pub fn new(failures: Vec<WriteFailure>) -> Self {
        Self { failures }
    }

    /// Whether any failure concerns the given record name
    pub fn mentions(&self, record: &str) -> bool {
        self.failures.iter().any(|f| f.record == record)
    }
}

impl std::error::Error for ApplyError {}

impl fmt::Display for ApplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to apply {} change(s)", self.failures.len())?;
        for (i, failure) in self.failures.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{failure}")?;
        }
        Ok(())
    }
}
