//! Endpoint filter predicates
//!
//! Providers apply one filter to decide which endpoints get forward records
//! and another for reverse records. Filters are built from declarative
//! [`FilterConfig`] or from arbitrary closures.

use crate::config::FilterConfig;
use crate::endpoint::{Endpoint, SOURCE_PROPERTY};
use std::fmt;
use std::sync::Arc;

/// A shareable `(Endpoint) -> bool` predicate
#[derive(Clone)]
pub struct EndpointFilter(Arc<dyn Fn(&Endpoint) -> bool + Send + Sync>);

impl EndpointFilter {
    /// Wrap a closure
    pub fn new(predicate: impl Fn(&Endpoint) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(predicate))
    }

    /// Filter that accepts every endpoint
    pub fn accept_all() -> Self {
        Self::new(|_| true)
    }

    /// Evaluate the predicate
    pub fn matches(&self, endpoint: &Endpoint) -> bool {
        (self.0)(endpoint)
    }

    /// Keep only matching endpoints, preserving order
    pub fn apply<'a>(&self, endpoints: &'a [Endpoint]) -> Vec<&'a Endpoint> {
        endpoints.iter().filter(|e| self.matches(e)).collect()
    }
}

impl Default for EndpointFilter {
    fn default() -> Self {
        Self::accept_all()
    }
}

impl fmt::Debug for EndpointFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EndpointFilter(..)")
    }
}

impl From<&FilterConfig> for EndpointFilter {
    fn from(config: &FilterConfig) -> Self {
        if config.is_empty() {
            return Self::accept_all();
        }
        let config = config.clone();
        Self::new(move |endpoint| {
            let source = endpoint
                .source_properties
                .get(SOURCE_PROPERTY)
                .and_then(serde_json::Value::as_str);

            if !config.include_sources.is_empty()
                && !source.is_some_and(|s| config.include_sources.iter().any(|i| i == s))
            {
                return false;
            }
            if source.is_some_and(|s| config.exclude_sources.iter().any(|e| e == s)) {
                return false;
            }
            if config.require_hostname && endpoint.hostname.is_empty() {
                return false;
            }
            config
                .source_properties
                .iter()
                .all(|(key, wanted)| endpoint.source_properties.get(key) == Some(wanted))
        })
    }
}

/// The pair of filters every provider is built with
#[derive(Debug, Clone, Default)]
pub struct ProviderFilters {
    /// Endpoints eligible for forward (A/AAAA) records
    pub forward: EndpointFilter,
    /// Endpoints eligible for reverse (PTR) records
    pub reverse: EndpointFilter,
}

impl ProviderFilters {
    /// Build both filters from their declarative configuration
    pub fn from_config(forward: &FilterConfig, reverse: &FilterConfig) -> Self {
        Self {
            forward: forward.into(),
            reverse: reverse.into(),
        }
    }
}
