// # HTTP Endpoint Source
//
// This crate provides an endpoint source that reads a JSON endpoint list
// over HTTP.
//
// ## Purpose
//
// - Chaining ZonePop instances: one daemon's `GET /endpoints/forward` feeds
//   another daemon's source
// - Inventory systems that can export JSON
// - CI/CD testing against a fixed document
//
// ## Wire Format
//
// A JSON array of endpoints:
//
// ```json
// [{"hostname": "nas", "ipv4s": ["192.0.2.10"], "ttl": 300}]
// ```
//
// ## Behavior
//
// - One GET per pass, with a request timeout (10 seconds by default)
// - Non-2xx responses and malformed bodies fail the source for that pass
// - NO retries: the next scheduled pass is the retry

use async_trait::async_trait;
use std::time::Duration;

use zonepop_core::config::{SourceConfig, SourceKind};
use zonepop_core::traits::{EndpointSource, SourceFactory};
use zonepop_core::{Endpoint, Error, Registry, Result};

/// Default request timeout for the HTTP source
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Endpoint source backed by a JSON document over HTTP
#[derive(Debug)]
pub struct HttpSource {
    /// URL returning a JSON array of endpoints
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpSource {
    /// Create a new HTTP source
    ///
    /// # Parameters
    ///
    /// - `url`: URL returning a JSON array of endpoints
    /// - `timeout`: Request timeout
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    async fn fetch(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| Error::http(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::http(format!("{} returned {status}", self.url)));
        }

        response
            .text()
            .await
            .map_err(|e| Error::http(format!("Failed to read response: {e}")))
    }
}

/// Parse the endpoint wire format
pub fn parse_endpoints(body: &str) -> Result<Vec<Endpoint>> {
    serde_json::from_str(body)
        .map_err(|e| Error::http(format!("Invalid endpoint list: {e}")))
}

#[async_trait]
impl EndpointSource for HttpSource {
    async fn endpoints(&self) -> Result<Vec<Endpoint>> {
        let body = self.fetch().await?;
        let endpoints = parse_endpoints(&body)?;
        tracing::debug!(url = %self.url, endpoints = endpoints.len(), "Fetched endpoints");
        Ok(endpoints)
    }
}

/// Factory for creating HTTP sources
pub struct HttpSourceFactory;

impl SourceFactory for HttpSourceFactory {
    fn create(&self, config: &SourceConfig) -> Result<Box<dyn EndpointSource>> {
        match &config.kind {
            SourceKind::Http { url, timeout_secs } => Ok(Box::new(HttpSource::new(
                url.clone(),
                Duration::from_secs(*timeout_secs),
            )?)),
            _ => Err(Error::config(format!(
                "Invalid config for HTTP source {}",
                config.name
            ))),
        }
    }
}

/// Register the HTTP source with a registry
pub fn register(registry: &Registry) {
    registry.register_source("http", Box::new(HttpSourceFactory));
}
