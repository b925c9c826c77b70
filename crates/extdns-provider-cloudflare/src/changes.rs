//! Change building and record matching
//!
//! Both functions are pure: no zone lookup or remote call happens here.

use extdns_core::endpoint::normalize_name;
use extdns_core::{ChangeAction, Endpoint};

use crate::mapper;
use crate::types::DnsRecord;

/// A native record tagged with the action to perform on it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudflareChange {
    pub action: ChangeAction,
    pub record: DnsRecord,
}

/// Turn a batch of endpoints into changes, one per endpoint, in input order
pub fn new_changes(action: ChangeAction, endpoints: &[Endpoint], proxied: bool) -> Vec<CloudflareChange> {
    endpoints
        .iter()
        .map(|endpoint| CloudflareChange {
            action,
            record: mapper::to_native(endpoint, proxied),
        })
        .collect()
}

/// Find the id of the existing record `candidate` would replace
///
/// Records match on `(name, type)` only; the content is ignored. `None`
/// means the record does not exist and must be created.
pub fn find_record_id(existing: &[DnsRecord], candidate: &DnsRecord) -> Option<String> {
    let name = normalize_name(&candidate.name);
    existing
        .iter()
        .filter(|record| {
            normalize_name(&record.name) == name
                && record.record_type.eq_ignore_ascii_case(&candidate.record_type)
        })
        .find_map(|record| record.id.clone())
}
