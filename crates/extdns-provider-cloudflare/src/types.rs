//! Cloudflare API v4 wire types

use serde::{Deserialize, Serialize};

use crate::client::ApiError;

/// Cloudflare "automatic" TTL
pub const AUTOMATIC_TTL: u32 = 1;

fn automatic_ttl() -> u32 {
    AUTOMATIC_TTL
}

/// A DNS record as the Cloudflare API represents it
///
/// `id` is assigned by Cloudflare and is absent until the record has been
/// created. The record type is kept as a string because a zone may hold
/// types ExtDNS does not manage (NS, SOA, MX, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "type", default)]
    pub record_type: String,
    #[serde(default)]
    pub content: String,
    #[serde(default = "automatic_ttl")]
    pub ttl: u32,
    #[serde(default)]
    pub proxied: bool,
}

/// Query filter for listing records of a zone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub name: Option<String>,
    pub record_type: Option<String>,
}

impl RecordFilter {
    /// Query-string pairs for the list call
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(name) = &self.name {
            query.push(("name", name.clone()));
        }
        if let Some(record_type) = &self.record_type {
            query.push(("type", record_type.clone()));
        }
        query
    }
}

/// Standard Cloudflare response envelope
#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<ApiMessage>,
    pub result: Option<T>,
    pub result_info: Option<ResultInfo>,
}

impl<T> ApiResponse<T> {
    /// Joined error messages of an unsuccessful response
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return "request was not successful".to_string();
        }
        self.errors
            .iter()
            .map(|e| format!("{} (code {})", e.message, e.code))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn into_result(self, context: &str) -> Result<T, ApiError> {
        self.result
            .ok_or_else(|| ApiError::Decode(format!("{context}: response has no result")))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiMessage {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// Pagination details
#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct ResultInfo {
    #[serde(default)]
    pub total_pages: u32,
}

/// Result of `GET /user` and `GET /user/tokens/verify`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Identity {
    pub id: String,
    /// Token status; only present for token verification
    #[serde(default)]
    pub status: Option<String>,
}
