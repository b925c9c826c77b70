// # extdns-core
//
// Core library for reconciling a desired set of DNS records against the
// records held by a remote DNS provider.
//
// ## Architecture Overview
//
// - **Endpoint**: Provider-agnostic desired record (hostname, target, type)
// - **Zone**: Remote namespace plus longest-suffix zone selection
// - **DomainFilter**: Suffix scoping of zones and hostnames
// - **Plan / Changes**: Desired-vs-current diff in four buckets
// - **DnsProvider**: Trait every remote DNS backend implements
// - **Source**: Trait producing the desired endpoints
// - **Controller**: Runs read → diff → write passes on an interval
// - **ProviderRegistry**: Plugin-based registry for DNS providers
//
// ## Design Principles
//
// 1. **Fresh snapshots**: Every pass re-reads remote state; no cache survives a pass
// 2. **Fail-fast reads**: An incomplete snapshot is never diffed
// 3. **Fail-soft writes**: Every write is attempted, failures are aggregated
// 4. **Plugin-Based**: Providers are registered dynamically, no hard-coded if-else

pub mod config;
pub mod controller;
pub mod domain_filter;
pub mod endpoint;
pub mod error;
pub mod plan;
pub mod registry;
pub mod traits;
pub mod zone;

// Re-export core types for convenience
pub use config::{CloudflareAuth, ControllerConfig, EndpointConfig, ExtDnsConfig, ProviderConfig, SourceConfig};
pub use controller::{Controller, ControllerEvent};
pub use domain_filter::DomainFilter;
pub use endpoint::{Endpoint, RecordKey, RecordType};
pub use error::{ApplyError, Error, Result, WriteFailure};
pub use plan::{ChangeAction, Changes, Plan, Policy};
pub use registry::ProviderRegistry;
pub use traits::{DnsProvider, DnsProviderFactory, Source, StaticSource};
pub use zone::{Zone, suitable_zone};
