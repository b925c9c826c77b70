//! Test doubles and common utilities for Cloudflare provider tests
//!
//! [`FakeCloudflareApi`] is the only remote client double. Each failure
//! mode is a field set through a builder method, and every call is
//! recorded so tests can assert exactly what reached the remote side.

#![allow(dead_code)]

use extdns_core::{DomainFilter, Zone};
use extdns_provider_cloudflare::{
    ApiError, CloudflareApi, CloudflareOptions, CloudflareProvider, DnsRecord, RecordFilter,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A call that reached the fake client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    AccountIdentity,
    ListZones,
    ListRecords { zone_id: String },
    Create { zone_id: String, name: String, record_type: String, content: String, proxied: bool },
    Update { zone_id: String, record_id: String, name: String, content: String },
    Delete { zone_id: String, record_id: String },
}

impl Call {
    pub fn is_write(&self) -> bool {
        matches!(self, Call::Create { .. } | Call::Update { .. } | Call::Delete { .. })
    }
}

/// Configurable in-memory Cloudflare API
///
/// Writes mutate the in-memory record set so a later listing observes them.
#[derive(Default)]
pub struct FakeCloudflareApi {
    zones: Vec<Zone>,
    records: Mutex<HashMap<String, Vec<DnsRecord>>>,
    calls: Mutex<Vec<Call>>,
    next_id: AtomicUsize,

    fail_identity: bool,
    fail_list_zones: bool,
    /// Zone ids whose record listing fails
    fail_list_records: HashSet<String>,
    /// Record names whose create fails
    fail_create: HashSet<String>,
    /// Record names whose update fails
    fail_update: HashSet<String>,
    /// Record names whose delete fails
    fail_delete: HashSet<String>,
}

impl FakeCloudflareApi {
    pub fn new() -> Self {
        Self {
            next_id: AtomicUsize::new(1000),
            ..Default::default()
        }
    }

    pub fn with_zone(mut self, id: &str, name: &str) -> Self {
        self.zones.push(Zone::new(id, name));
        self
    }

    pub fn with_record(self, zone_id: &str, id: &str, name: &str, record_type: &str, content: &str) -> Self {
        self.records
            .lock()
            .unwrap()
            .entry(zone_id.to_string())
            .or_default()
            .push(record(Some(id), name, record_type, content));
        self
    }

    pub fn failing_identity(mut self) -> Self {
        self.fail_identity = true;
        self
    }

    pub fn failing_list_zones(mut self) -> Self {
        self.fail_list_zones = true;
        self
    }

    pub fn failing_list_records(mut self, zone_id: &str) -> Self {
        self.fail_list_records.insert(zone_id.to_string());
        self
    }

    pub fn failing_create(mut self, name: &str) -> Self {
        self.fail_create.insert(name.to_string());
        self
    }

    pub fn failing_update(mut self, name: &str) -> Self {
        self.fail_update.insert(name.to_string());
        self
    }

    pub fn failing_delete(mut self, name: &str) -> Self {
        self.fail_delete.insert(name.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_write).collect()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| predicate(c)).count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn records_in(&self, zone_id: &str) -> Vec<DnsRecord> {
        self.records
            .lock()
            .unwrap()
            .get(zone_id)
            .cloned()
            .unwrap_or_default()
    }

    fn record_call(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl CloudflareApi for FakeCloudflareApi {
    async fn list_zones(&self, zone_ids: &[String]) -> Result<Vec<Zone>, ApiError> {
        self.record_call(Call::ListZones);
        if self.fail_list_zones {
            return Err(ApiError::Server("GET /zones: status 503".to_string()));
        }
        Ok(self
            .zones
            .iter()
            .filter(|z| zone_ids.is_empty() || zone_ids.contains(&z.id))
            .cloned()
            .collect())
    }

    async fn list_records(&self, zone_id: &str, filter: &RecordFilter) -> Result<Vec<DnsRecord>, ApiError> {
        self.record_call(Call::ListRecords {
            zone_id: zone_id.to_string(),
        });
        if self.fail_list_records.contains(zone_id) {
            return Err(ApiError::Server(format!("GET /zones/{zone_id}/dns_records: status 500")));
        }
        Ok(self
            .records_in(zone_id)
            .into_iter()
            .filter(|r| filter.name.as_ref().is_none_or(|n| *n == r.name))
            .filter(|r| filter.record_type.as_ref().is_none_or(|t| *t == r.record_type))
            .collect())
    }

    async fn create_record(&self, zone_id: &str, record: &DnsRecord) -> Result<DnsRecord, ApiError> {
        self.record_call(Call::Create {
            zone_id: zone_id.to_string(),
            name: record.name.clone(),
            record_type: record.record_type.clone(),
            content: record.content.clone(),
            proxied: record.proxied,
        });
        if self.fail_create.contains(&record.name) {
            return Err(ApiError::Api(format!("create {} rejected", record.name)));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        let mut created = record.clone();
        created.id = Some(id);
        self.records
            .lock()
            .unwrap()
            .entry(zone_id.to_string())
            .or_default()
            .push(created.clone());
        Ok(created)
    }

    async fn update_record(&self, zone_id: &str, record_id: &str, record: &DnsRecord) -> Result<(), ApiError> {
        self.record_call(Call::Update {
            zone_id: zone_id.to_string(),
            record_id: record_id.to_string(),
            name: record.name.clone(),
            content: record.content.clone(),
        });
        if self.fail_update.contains(&record.name) {
            return Err(ApiError::Conflict(format!("update {} rejected", record.name)));
        }

        let mut records = self.records.lock().unwrap();
        let existing = records
            .get_mut(zone_id)
            .and_then(|zone| zone.iter_mut().find(|r| r.id.as_deref() == Some(record_id)))
            .ok_or_else(|| ApiError::NotFound(format!("record {record_id}")))?;
        existing.content = record.content.clone();
        existing.proxied = record.proxied;
        Ok(())
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<(), ApiError> {
        self.record_call(Call::Delete {
            zone_id: zone_id.to_string(),
            record_id: record_id.to_string(),
        });

        let mut records = self.records.lock().unwrap();
        let zone = records.entry(zone_id.to_string()).or_default();
        let Some(pos) = zone.iter().position(|r| r.id.as_deref() == Some(record_id)) else {
            return Err(ApiError::NotFound(format!("record {record_id}")));
        };
        if self.fail_delete.contains(&zone[pos].name) {
            return Err(ApiError::Server(format!("delete {} failed", zone[pos].name)));
        }
        zone.remove(pos);
        Ok(())
    }

    async fn account_identity(&self) -> Result<String, ApiError> {
        self.record_call(Call::AccountIdentity);
        if self.fail_identity {
            return Err(ApiError::Unauthorized("GET /user: Invalid request headers (code 6003)".to_string()));
        }
        Ok("account-1".to_string())
    }
}

pub fn record(id: Option<&str>, name: &str, record_type: &str, content: &str) -> DnsRecord {
    DnsRecord {
        id: id.map(str::to_string),
        name: name.to_string(),
        record_type: record_type.to_string(),
        content: content.to_string(),
        ttl: 1,
        proxied: false,
    }
}

/// Connect a provider to the fake with the given options
pub async fn connect(api: &Arc<FakeCloudflareApi>, options: CloudflareOptions) -> CloudflareProvider {
    let client: Arc<dyn CloudflareApi> = api.clone();
    CloudflareProvider::connect(client, options)
        .await
        .expect("provider connects")
}

/// Options restricted to `filter`
pub fn filtered(filter: &str) -> CloudflareOptions {
    CloudflareOptions {
        domain_filter: DomainFilter::new(filter),
        ..Default::default()
    }
}
