// # Endpoint Source Trait
//
// A source produces the desired set of endpoints for one reconciliation
// pass. It is an observer: it never talks to a DNS provider and never
// decides what to change.

use async_trait::async_trait;

use crate::config::EndpointConfig;
use crate::endpoint::Endpoint;
use crate::error::Result;

/// Trait for desired-state sources
#[async_trait]
pub trait Source: Send + Sync {
    /// Return the complete desired endpoint set
    ///
    /// Called once per pass; the result is not cached.
    async fn endpoints(&self) -> Result<Vec<Endpoint>>;
}

/// Source backed by a fixed list of endpoints
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    endpoints: Vec<Endpoint>,
}

impl StaticSource {
    pub fn new(endpoints: Vec<Endpoint>) -> Self {
        Self { endpoints }
    }

    /// Build a static source from configured endpoints
    pub fn from_config(configs: &[EndpointConfig]) -> Result<Self> {
        let endpoints = configs
            .iter()
            .map(EndpointConfig::to_endpoint)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(endpoints))
    }
}

#[async_trait]
impl Source for StaticSource {
    async fn endpoints(&self) -> Result<Vec<Endpoint>> {
        Ok(self.endpoints.clone())
    }
}
