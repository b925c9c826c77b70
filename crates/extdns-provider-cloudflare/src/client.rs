//! Cloudflare API v4 client
//!
//! [`CloudflareApi`] is the complete remote surface the provider consumes.
//! [`HttpCloudflareClient`] implements it over HTTPS; tests implement it
//! with an in-memory fake.
//!
//! The client does not retry. A failed call is reported to the provider,
//! which aggregates write failures and leaves retrying to the next pass.

use async_trait::async_trait;
use extdns_core::{CloudflareAuth, Error, Zone};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

use crate::types::{ApiResponse, DnsRecord, Identity, RecordFilter};

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Page sizes used when listing
const ZONES_PER_PAGE: u32 = 50;
const RECORDS_PER_PAGE: u32 = 100;

/// Errors reported by the Cloudflare API client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("authentication failed: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("server error (transient): {0}")]
    Server(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("invalid response: {0}")]
    Decode(String),
}

impl From<ApiError> for Error {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized(msg) => Error::auth(msg),
            ApiError::NotFound(msg) => Error::not_found(msg),
            other => Error::provider("cloudflare", other.to_string()),
        }
    }
}

/// Map a non-success HTTP status to an [`ApiError`]
///
/// The body is searched for a Cloudflare error envelope so the message
/// carries Cloudflare's own explanation when there is one.
pub(crate) fn status_error(status: StatusCode, body: &str, context: &str) -> ApiError {
    let detail = serde_json::from_str::<ApiResponse<serde_json::Value>>(body)
        .ok()
        .filter(|envelope| !envelope.errors.is_empty())
        .map(|envelope| envelope.error_summary())
        .unwrap_or_else(|| format!("status {status}"));
    let msg = format!("{context}: {detail}");

    match status.as_u16() {
        401 | 403 => ApiError::Unauthorized(msg),
        404 => ApiError::NotFound(msg),
        409 => ApiError::Conflict(msg),
        429 => ApiError::RateLimited(msg),
        500..=599 => ApiError::Server(msg),
        _ => ApiError::Api(msg),
    }
}

/// The remote operations the Cloudflare provider needs
#[async_trait]
pub trait CloudflareApi: Send + Sync {
    /// List zones visible to the account, or only the given ids when non-empty
    async fn list_zones(&self, zone_ids: &[String]) -> Result<Vec<Zone>, ApiError>;

    /// List the records of a zone matching `filter`
    async fn list_records(
        &self,
        zone_id: &str,
        filter: &RecordFilter,
    ) -> Result<Vec<DnsRecord>, ApiError>;

    /// Create a record; the returned record carries its new id
    async fn create_record(&self, zone_id: &str, record: &DnsRecord) -> Result<DnsRecord, ApiError>;

    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        record: &DnsRecord,
    ) -> Result<(), ApiError>;

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<(), ApiError>;

    /// Resolve the id of the account (or token) behind the credentials
    async fn account_identity(&self) -> Result<String, ApiError>;
}

/// HTTPS implementation of [`CloudflareApi`]
pub struct HttpCloudflareClient {
    /// ⚠️ NEVER log this value
    auth: CloudflareAuth,
    base_url: String,
    client: reqwest::Client,
}

// Custom Debug implementation that hides the credentials
impl std::fmt::Debug for HttpCloudflareClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCloudflareClient")
            .field("auth", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl HttpCloudflareClient {
    /// Create a client for the public Cloudflare API
    pub fn new(auth: CloudflareAuth) -> Result<Self, ApiError> {
        Self::with_base_url(auth, CLOUDFLARE_API_BASE)
    }

    /// Create a client for a different API endpoint
    pub fn with_base_url(auth: CloudflareAuth, base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            auth,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Start a request with credentials attached
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .header("Content-Type", "application/json");

        match &self.auth {
            CloudflareAuth::ApiKey { key, email } => builder
                .header("X-Auth-Key", key)
                .header("X-Auth-Email", email),
            CloudflareAuth::ApiToken { token } => builder.bearer_auth(token),
        }
    }

    /// Send a request and decode the response envelope
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        context: &str,
    ) -> Result<ApiResponse<T>, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Request(format!("{context}: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Request(format!("{context}: failed to read body: {e}")))?;

        if !status.is_success() {
            return Err(status_error(status, &body, context));
        }

        let envelope: ApiResponse<T> = serde_json::from_str(&body)
            .map_err(|e| ApiError::Decode(format!("{context}: {e}")))?;

        if !envelope.success {
            return Err(ApiError::Api(format!("{context}: {}", envelope.error_summary())));
        }

        Ok(envelope)
    }

    /// Fetch every page of a list endpoint
    async fn get_paginated<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&'static str, String)],
        per_page: u32,
    ) -> Result<Vec<T>, ApiError> {
        let context = format!("GET {path}");
        let mut items = Vec::new();
        let mut page: u32 = 1;

        loop {
            let request = self
                .request(Method::GET, path)
                .query(query)
                .query(&[("page", page), ("per_page", per_page)]);
            let envelope: ApiResponse<Vec<T>> = self.send(request, &context).await?;

            let total_pages = envelope.result_info.map(|info| info.total_pages);
            items.extend(envelope.into_result(&context)?);

            match total_pages {
                Some(total) if page < total => page += 1,
                _ => break,
            }
        }

        tracing::debug!(path, count = items.len(), pages = page, "Listed");
        Ok(items)
    }
}

#[async_trait]
impl CloudflareApi for HttpCloudflareClient {
    async fn list_zones(&self, zone_ids: &[String]) -> Result<Vec<Zone>, ApiError> {
        if zone_ids.is_empty() {
            return self.get_paginated("/zones", &[], ZONES_PER_PAGE).await;
        }

        let mut zones = Vec::with_capacity(zone_ids.len());
        for zone_id in zone_ids {
            let path = format!("/zones/{zone_id}");
            let context = format!("GET {path}");
            let envelope: ApiResponse<Zone> =
                self.send(self.request(Method::GET, &path), &context).await?;
            zones.push(envelope.into_result(&context)?);
        }
        Ok(zones)
    }

    async fn list_records(
        &self,
        zone_id: &str,
        filter: &RecordFilter,
    ) -> Result<Vec<DnsRecord>, ApiError> {
        let path = format!("/zones/{zone_id}/dns_records");
        self.get_paginated(&path, &filter.query(), RECORDS_PER_PAGE)
            .await
    }

    async fn create_record(&self, zone_id: &str, record: &DnsRecord) -> Result<DnsRecord, ApiError> {
        let path = format!("/zones/{zone_id}/dns_records");
        let context = format!("POST {path}");
        let envelope: ApiResponse<DnsRecord> = self
            .send(self.request(Method::POST, &path).json(record), &context)
            .await?;
        envelope.into_result(&context)
    }

    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        record: &DnsRecord,
    ) -> Result<(), ApiError> {
        let path = format!("/zones/{zone_id}/dns_records/{record_id}");
        let context = format!("PUT {path}");
        let _: ApiResponse<serde_json::Value> = self
            .send(self.request(Method::PUT, &path).json(record), &context)
            .await?;
        Ok(())
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<(), ApiError> {
        let path = format!("/zones/{zone_id}/dns_records/{record_id}");
        let context = format!("DELETE {path}");
        let _: ApiResponse<serde_json::Value> = self
            .send(self.request(Method::DELETE, &path), &context)
            .await?;
        Ok(())
    }

    async fn account_identity(&self) -> Result<String, ApiError> {
        let path = match &self.auth {
            CloudflareAuth::ApiKey { .. } => "/user",
            CloudflareAuth::ApiToken { .. } => "/user/tokens/verify",
        };
        let context = format!("GET {path}");

        let envelope: ApiResponse<Identity> =
            self.send(self.request(Method::GET, path), &context).await?;
        let identity = envelope.into_result(&context)?;

        match identity.status.as_deref() {
            None | Some("active") => Ok(identity.id),
            Some(status) => Err(ApiError::Unauthorized(format!(
                "{context}: token is {status}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_errors() {
        let cases = [
            (StatusCode::UNAUTHORIZED, "Unauthorized"),
            (StatusCode::FORBIDDEN, "Unauthorized"),
            (StatusCode::NOT_FOUND, "NotFound"),
            (StatusCode::CONFLICT, "Conflict"),
            (StatusCode::TOO_MANY_REQUESTS, "RateLimited"),
            (StatusCode::BAD_GATEWAY, "Server"),
            (StatusCode::BAD_REQUEST, "Api"),
        ];

        for (status, expected) in cases {
            let err = status_error(status, "", "GET /zones");
            let variant = format!("{err:?}");
            assert!(
                variant.starts_with(expected),
                "{status} mapped to {variant}, expected {expected}"
            );
        }
    }

    #[test]
    fn status_error_uses_cloudflare_message() {
        let body = r#"{"success":false,"errors":[{"code":9109,"message":"Invalid access token"}]}"#;
        let err = status_error(StatusCode::FORBIDDEN, body, "GET /user/tokens/verify");

        assert_eq!(
            err,
            ApiError::Unauthorized(
                "GET /user/tokens/verify: Invalid access token (code 9109)".to_string()
            )
        );
    }

    #[test]
    fn unauthorized_converts_to_authentication_error() {
        let err: Error = ApiError::Unauthorized("bad key".to_string()).into();
        assert!(matches!(err, Error::Authentication(_)));

        let err: Error = ApiError::Server("boom".to_string()).into();
        assert!(matches!(err, Error::Provider { .. }));
    }

    #[test]
    fn api_key_auth_headers() {
        let client =
            HttpCloudflareClient::new(CloudflareAuth::api_key("k3y", "ops@example.com")).unwrap();
        let request = client.request(Method::GET, "/zones").build().unwrap();

        assert_eq!(request.url().as_str(), "https://api.cloudflare.com/client/v4/zones");
        assert_eq!(request.headers()["X-Auth-Key"], "k3y");
        assert_eq!(request.headers()["X-Auth-Email"], "ops@example.com");
        assert!(request.headers().get("Authorization").is_none());
    }

    #[test]
    fn api_token_auth_header() {
        let client = HttpCloudflareClient::with_base_url(
            CloudflareAuth::api_token("t0ken"),
            "http://127.0.0.1:8080/",
        )
        .unwrap();
        let request = client.request(Method::GET, "/user/tokens/verify").build().unwrap();

        assert_eq!(request.url().as_str(), "http://127.0.0.1:8080/user/tokens/verify");
        assert_eq!(request.headers()["Authorization"], "Bearer t0ken");
    }

    #[test]
    fn credentials_not_exposed_in_debug() {
        let client = HttpCloudflareClient::new(CloudflareAuth::api_token("secret_token_12345")).unwrap();

        let debug_str = format!("{client:?}");
        assert!(!debug_str.contains("secret_token"));
        assert!(debug_str.contains("HttpCloudflareClient"));
    }
}
