//! Domain filter
//!
//! Restricts which zones and hostnames a provider instance may touch.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::endpoint::{is_subdomain_of, normalize_name};

/// Suffix-based scoping rule
///
/// A name is in scope when it equals the filter or is a subdomain of it.
/// The empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct DomainFilter {
    suffix: String,
}

impl DomainFilter {
    pub fn new(filter: impl AsRef<str>) -> Self {
        let filter = normalize_name(filter.as_ref());
        let suffix = filter.trim_start_matches('.').to_string();
        Self { suffix }
    }

    /// Filter that matches every name
    pub fn any() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.suffix.is_empty()
    }

    pub fn matches(&self, name: &str) -> bool {
        is_subdomain_of(&normalize_name(name), &self.suffix)
    }

    pub fn as_str(&self) -> &str {
        &self.suffix
    }
}

impl From<String> for DomainFilter {
    fn from(filter: String) -> Self {
        Self::new(filter)
    }
}

impl From<&str> for DomainFilter {
    fn from(filter: &str) -> Self {
        Self::new(filter)
    }
}

impl From<DomainFilter> for String {
    fn from(filter: DomainFilter) -> Self {
        filter.suffix
    }
}

impl fmt::Display for DomainFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("<any>")
        } else {
            f.write_str(&self.suffix)
        }
    }
}
