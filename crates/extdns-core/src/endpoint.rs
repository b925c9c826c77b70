//! Desired-state DNS endpoints
//!
//! An [`Endpoint`] is the provider-agnostic description of one DNS record:
//! a hostname, a target, and a record type. Endpoints are built fresh for
//! every reconciliation pass and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::error::Error;

/// DNS record types managed by ExtDNS
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordType {
    /// IPv4 address record
    A,
    /// IPv6 address record
    AAAA,
    /// Canonical name record
    CNAME,
    /// Text record
    TXT,
}

impl RecordType {
    /// Infer the record type from the shape of a target
    ///
    /// IPv4 literals map to `A`, IPv6 literals to `AAAA`, anything else is
    /// treated as a canonical name.
    pub fn infer(target: &str) -> Self {
        match target.trim().parse::<IpAddr>() {
            Ok(IpAddr::V4(_)) => RecordType::A,
            Ok(IpAddr::V6(_)) => RecordType::AAAA,
            Err(_) => RecordType::CNAME,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::AAAA => "AAAA",
            RecordType::CNAME => "CNAME",
            RecordType::TXT => "TXT",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::AAAA),
            "CNAME" => Ok(RecordType::CNAME),
            "TXT" => Ok(RecordType::TXT),
            other => Err(Error::invalid_input(format!(
                "Unsupported record type: '{other}'"
            ))),
        }
    }
}

/// Normalize a DNS name for comparison
///
/// Trims whitespace, lower-cases, and removes a single trailing dot so that
/// `Foo.Example.com.` and `foo.example.com` compare equal.
pub fn normalize_name(name: &str) -> String {
    let trimmed = name.trim();
    trimmed
        .strip_suffix('.')
        .unwrap_or(trimmed)
        .to_ascii_lowercase()
}

/// Whether `name` equals `suffix` or is a subdomain of it
///
/// Both arguments must already be normalized. An empty suffix matches
/// every name.
pub fn is_subdomain_of(name: &str, suffix: &str) -> bool {
    if suffix.is_empty() {
        return true;
    }
    name == suffix
        || name
            .strip_suffix(suffix)
            .is_some_and(|head| head.ends_with('.'))
}

/// Identity of a record: `(name, type)`
///
/// The target is deliberately not part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub name: String,
    pub record_type: RecordType,
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.record_type)
    }
}

/// A desired DNS record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// Fully qualified hostname (normalized, no trailing dot)
    pub dns_name: String,
    /// Record value: an address, canonical name, or text
    pub target: String,
    /// Record type
    pub record_type: RecordType,
}

impl Endpoint {
    /// Create an endpoint, inferring the record type from the target
    pub fn new(dns_name: impl AsRef<str>, target: impl Into<String>) -> Self {
        let target = target.into();
        let record_type = RecordType::infer(&target);
        Self::with_type(dns_name, target, record_type)
    }

    /// Create an endpoint with an explicit record type
    pub fn with_type(
        dns_name: impl AsRef<str>,
        target: impl Into<String>,
        record_type: RecordType,
    ) -> Self {
        let target = target.into();
        let target = match record_type {
            // Canonical names compare without the trailing dot as well
            RecordType::CNAME => normalize_name(&target),
            _ => target.trim().to_string(),
        };

        Self {
            dns_name: normalize_name(dns_name.as_ref()),
            target,
            record_type,
        }
    }

    /// The identity key of this endpoint
    pub fn key(&self) -> RecordKey {
        RecordKey {
            name: self.dns_name.clone(),
            record_type: self.record_type,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.dns_name, self.record_type, self.target)
    }
}
