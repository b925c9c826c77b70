//! Remote DNS zones and zone selection

use serde::{Deserialize, Serialize};

use crate::endpoint::{is_subdomain_of, normalize_name};

/// A DNS zone owned by the provider account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Opaque provider identifier
    #[serde(default)]
    pub id: String,
    /// Zone apex name
    #[serde(default)]
    pub name: String,
}

impl Zone {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Whether this zone owns `hostname` (the apex itself or a subdomain)
    pub fn owns(&self, hostname: &str) -> bool {
        let name = normalize_name(&self.name);
        !name.is_empty() && is_subdomain_of(&normalize_name(hostname), &name)
    }
}

/// Pick the zone that should hold `hostname`
///
/// Among all zones owning the hostname the one with the longest name wins,
/// so a delegated sub-zone takes precedence over its parent. Returns `None`
/// when no zone owns the hostname.
pub fn suitable_zone<'a>(hostname: &str, zones: &'a [Zone]) -> Option<&'a Zone> {
    zones
        .iter()
        .filter(|zone| zone.owns(hostname))
        .max_by_key(|zone| normalize_name(&zone.name).len())
}
