//! Fixed endpoint list

use async_trait::async_trait;

use crate::config::{SourceConfig, SourceKind};
use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::traits::{EndpointSource, SourceFactory};

/// Source returning the same configured endpoints on every pass
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    endpoints: Vec<Endpoint>,
}

impl StaticSource {
    pub fn new(endpoints: Vec<Endpoint>) -> Self {
        Self { endpoints }
    }
}

#[async_trait]
impl EndpointSource for StaticSource {
    async fn endpoints(&self) -> Result<Vec<Endpoint>> {
        Ok(self.endpoints.clone())
    }
}

/// Factory for `type = "static"` sources
pub struct StaticSourceFactory;

impl SourceFactory for StaticSourceFactory {
    fn create(&self, config: &SourceConfig) -> Result<Box<dyn EndpointSource>> {
        match &config.kind {
            SourceKind::Static { endpoints } => Ok(Box::new(StaticSource::new(endpoints.clone()))),
            _ => Err(Error::config(format!(
                "Source {}: not a static source configuration",
                config.name
            ))),
        }
    }
}
