//! Core traits for the ExtDNS system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`DnsProvider`]: Reconcile endpoints against a remote DNS API
//! - [`Source`]: Produce the desired endpoint set

pub mod dns_provider;
pub mod source;

pub use dns_provider::{DnsProvider, DnsProviderFactory};
pub use source::{Source, StaticSource};
