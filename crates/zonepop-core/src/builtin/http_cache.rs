//! Forward endpoint snapshot for HTTP readers
//!
//! The provider serializes its forward-filtered endpoints to JSON and swaps
//! the document into an [`EndpointCache`]. The daemon serves the cache at
//! `GET /endpoints/forward`, in the same format the HTTP source reads.

use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

use crate::config::{ProviderConfig, ProviderKind};
use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::filter::{EndpointFilter, ProviderFilters};
use crate::traits::{Provider, ProviderFactory};

/// Shared, cheaply clonable JSON document
#[derive(Debug, Clone)]
pub struct EndpointCache {
    forward: Arc<RwLock<Arc<str>>>,
}

impl Default for EndpointCache {
    fn default() -> Self {
        Self {
            forward: Arc::new(RwLock::new(Arc::from("[]"))),
        }
    }
}

impl EndpointCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current forward endpoint document
    pub fn forward(&self) -> Arc<str> {
        Arc::clone(&self.forward.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn replace_forward(&self, document: String) {
        *self.forward.write().unwrap_or_else(PoisonError::into_inner) = Arc::from(document);
    }
}

/// Provider publishing forward endpoints into an [`EndpointCache`]
#[derive(Debug, Clone)]
pub struct HttpCacheProvider {
    cache: EndpointCache,
    forward_filter: EndpointFilter,
}

impl HttpCacheProvider {
    pub fn new(cache: EndpointCache, forward_filter: EndpointFilter) -> Self {
        Self {
            cache,
            forward_filter,
        }
    }
}

#[async_trait]
impl Provider for HttpCacheProvider {
    async fn update_endpoints(&self, endpoints: &[Endpoint]) -> Result<()> {
        let forward = self.forward_filter.apply(endpoints);
        let document = serde_json::to_string(&forward)?;
        debug!(endpoints = forward.len(), "Publishing forward endpoint snapshot");
        self.cache.replace_forward(document);
        Ok(())
    }
}

/// Factory for `type = "http_cache"` providers
///
/// Every provider it creates writes into the same cache.
pub struct HttpCacheFactory {
    cache: EndpointCache,
}

impl HttpCacheFactory {
    pub fn new(cache: EndpointCache) -> Self {
        Self { cache }
    }
}

impl ProviderFactory for HttpCacheFactory {
    fn create(
        &self,
        config: &ProviderConfig,
        filters: ProviderFilters,
    ) -> Result<Box<dyn Provider>> {
        match &config.kind {
            ProviderKind::HttpCache => Ok(Box::new(HttpCacheProvider::new(
                self.cache.clone(),
                filters.forward,
            ))),
            _ => Err(Error::config(format!(
                "Provider {}: not an http_cache configuration",
                config.name
            ))),
        }
    }
}
