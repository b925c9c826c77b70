//! Conversion between endpoints and Cloudflare records

use extdns_core::endpoint::normalize_name;
use extdns_core::{Endpoint, RecordType};

use crate::types::{AUTOMATIC_TTL, DnsRecord};

/// Record types that can be routed through the Cloudflare edge
pub fn is_proxiable(record_type: RecordType) -> bool {
    matches!(record_type, RecordType::A | RecordType::AAAA | RecordType::CNAME)
}

/// Build the native record for an endpoint
///
/// `proxied` only takes effect for proxiable types. The record has no id;
/// ids are resolved against the zone's record list when needed.
pub fn to_native(endpoint: &Endpoint, proxied: bool) -> DnsRecord {
    DnsRecord {
        id: None,
        name: endpoint.dns_name.clone(),
        record_type: endpoint.record_type.to_string(),
        content: endpoint.target.clone(),
        ttl: AUTOMATIC_TTL,
        proxied: proxied && is_proxiable(endpoint.record_type),
    }
}

/// Map a native record back to an endpoint
///
/// Returns `None` for record types ExtDNS does not manage, including the
/// NS and SOA records Cloudflare keeps at every zone apex and records
/// without a type.
pub fn to_endpoint(record: &DnsRecord) -> Option<Endpoint> {
    let record_type = record.record_type.parse::<RecordType>().ok()?;
    Some(Endpoint::with_type(
        normalize_name(&record.name),
        record.content.clone(),
        record_type,
    ))
}
