//! Test doubles and common utilities for controller contract tests
//!
//! The mock provider keeps an in-memory record set and applies changes to
//! it, so consecutive passes observe the result of earlier ones the way a
//! real remote service would.

#![allow(dead_code)]

use extdns_core::error::{Error, Result};
use extdns_core::{Changes, ControllerConfig, DnsProvider, Endpoint, Policy, Source, Zone};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A mock DnsProvider backed by an in-memory record set
pub struct MockDnsProvider {
    /// Current remote records
    records: Arc<Mutex<Vec<Endpoint>>>,
    /// Every change set passed to apply_changes()
    applied: Arc<Mutex<Vec<Changes>>>,
    /// Call counter for records()
    records_call_count: Arc<AtomicUsize>,
    /// Fail records() with a listing error
    fail_records: bool,
    /// Fail apply_changes() with this message after applying nothing
    apply_error: Option<String>,
}

impl MockDnsProvider {
    pub fn new(records: Vec<Endpoint>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
            applied: Arc::new(Mutex::new(Vec::new())),
            records_call_count: Arc::new(AtomicUsize::new(0)),
            fail_records: false,
            apply_error: None,
        }
    }

    pub fn failing_records(mut self) -> Self {
        self.fail_records = true;
        self
    }

    pub fn failing_apply(mut self, message: &str) -> Self {
        self.apply_error = Some(message.to_string());
        self
    }

    /// Create a new MockDnsProvider that shares state with an existing one
    pub fn sharing_state_with(other: &Self) -> Self {
        Self {
            records: Arc::clone(&other.records),
            applied: Arc::clone(&other.applied),
            records_call_count: Arc::clone(&other.records_call_count),
            fail_records: other.fail_records,
            apply_error: other.apply_error.clone(),
        }
    }

    pub fn applied(&self) -> Vec<Changes> {
        self.applied.lock().unwrap().clone()
    }

    pub fn current(&self) -> Vec<Endpoint> {
        self.records.lock().unwrap().clone()
    }

    pub fn records_call_count(&self) -> usize {
        self.records_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn zones(&self) -> Result<Vec<Zone>> {
        Ok(vec![Zone::new("1", "example.com")])
    }

    async fn records(&self) -> Result<Vec<Endpoint>> {
        self.records_call_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_records {
            return Err(Error::remote_list("mock listing failure"));
        }
        Ok(self.current())
    }

    async fn apply_changes(&self, changes: &Changes) -> Result<()> {
        changes.validate()?;
        self.applied.lock().unwrap().push(changes.clone());

        if let Some(message) = &self.apply_error {
            return Err(Error::provider("mock", message.clone()));
        }

        let mut records = self.records.lock().unwrap();
        records.retain(|r| {
            !changes.delete.iter().any(|d| d.key() == r.key())
                && !changes.update_old.iter().any(|o| o.key() == r.key())
        });
        records.extend(changes.update_new.iter().cloned());
        records.extend(changes.create.iter().cloned());
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// A source whose desired endpoints can be swapped between passes
#[derive(Clone, Default)]
pub struct ControlledSource {
    endpoints: Arc<Mutex<Vec<Endpoint>>>,
    fail: Arc<Mutex<bool>>,
}

impl ControlledSource {
    pub fn new(endpoints: Vec<Endpoint>) -> Self {
        Self {
            endpoints: Arc::new(Mutex::new(endpoints)),
            fail: Arc::new(Mutex::new(false)),
        }
    }

    pub fn set(&self, endpoints: Vec<Endpoint>) {
        *self.endpoints.lock().unwrap() = endpoints;
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }
}

#[async_trait::async_trait]
impl Source for ControlledSource {
    async fn endpoints(&self) -> Result<Vec<Endpoint>> {
        if *self.fail.lock().unwrap() {
            return Err(Error::Other("source unavailable".to_string()));
        }
        Ok(self.endpoints.lock().unwrap().clone())
    }
}

/// Helper to create a controller config suitable for tests
pub fn test_config(policy: Policy) -> ControllerConfig {
    ControllerConfig {
        interval_secs: 3600,
        policy,
        once: false,
        event_channel_capacity: 16,
    }
}
