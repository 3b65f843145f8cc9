//! Plugin-based component registry
//!
//! The registry allows sources and providers to be registered dynamically
//! at runtime, avoiding hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use zonepop_core::registry::Registry;
//! use zonepop_core::config::ZonepopConfig;
//!
//! // Create a registry with the in-core components
//! let registry = Registry::with_builtins();
//!
//! // Plugin crates add their own factories
//! zonepop_provider_file::register(&registry);
//!
//! // Build the whole controller from config
//! let config = ZonepopConfig::load("zonepop.toml")?;
//! let controller = registry.build_controller(&config)?;
//! ```
//!
//! ## Registration
//!
//! Implementations should register themselves during initialization:
//!
//! ```rust,ignore
//! pub fn register(registry: &Registry) {
//!     registry.register_provider("file", Box::new(FileProviderFactory));
//! }
//! ```

use crate::builtin::{EndpointCache, HttpCacheFactory, MetricsProviderFactory, StaticSourceFactory};
use crate::config::{ProviderConfig, SourceConfig, ZonepopConfig};
use crate::controller::{Controller, NamedProvider, NamedSource};
use crate::error::{Error, Result};
use crate::filter::ProviderFilters;
use crate::traits::{ProviderFactory, SourceFactory};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::debug;

/// Component registry for plugin-based source and provider creation
///
/// The registry maintains maps of component type names to factory objects,
/// allowing dynamic instantiation based on configuration.
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct Registry {
    /// Registered source factories
    sources: RwLock<HashMap<String, Box<dyn SourceFactory>>>,

    /// Registered provider factories
    providers: RwLock<HashMap<String, Box<dyn ProviderFactory>>>,

    /// Cache written by `http_cache` providers
    endpoint_cache: EndpointCache,
}

impl Registry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with `static`, `http_cache` and `metrics` registered
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register_source("static", Box::new(StaticSourceFactory));
        registry.register_provider(
            "http_cache",
            Box::new(HttpCacheFactory::new(registry.endpoint_cache.clone())),
        );
        registry.register_provider("metrics", Box::new(MetricsProviderFactory));
        registry
    }

    /// Cache shared by every `http_cache` provider built by this registry
    pub fn endpoint_cache(&self) -> EndpointCache {
        self.endpoint_cache.clone()
    }

    /// Register a source factory
    ///
    /// # Parameters
    ///
    /// - `name`: Source type name (e.g., "static", "http")
    /// - `factory`: Factory object for creating source instances
    pub fn register_source(&self, name: impl Into<String>, factory: Box<dyn SourceFactory>) {
        let name = name.into();
        debug!(kind = %name, "Registering source factory");
        self.sources
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, factory);
    }

    /// Register a provider factory
    ///
    /// # Parameters
    ///
    /// - `name`: Provider type name (e.g., "authoritative", "file")
    /// - `factory`: Factory object for creating provider instances
    pub fn register_provider(&self, name: impl Into<String>, factory: Box<dyn ProviderFactory>) {
        let name = name.into();
        debug!(kind = %name, "Registering provider factory");
        self.providers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, factory);
    }

    /// Create a source from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(NamedSource)`: Created source, carrying its configured name
    /// - `Err(Error)`: If the source type is not registered or creation fails
    pub fn create_source(&self, config: &SourceConfig) -> Result<NamedSource> {
        let source_type = config.type_name();
        let sources = self.sources.read().unwrap_or_else(PoisonError::into_inner);

        let factory = sources
            .get(source_type)
            .ok_or_else(|| Error::config(format!("Unknown source type: {source_type}")))?;

        Ok(NamedSource::new(&config.name, factory.create(config)?))
    }

    /// Create a provider from configuration
    ///
    /// Both filter sections are compiled into predicates before the factory
    /// is invoked.
    ///
    /// # Returns
    ///
    /// - `Ok(NamedProvider)`: Created provider, carrying its configured name
    /// - `Err(Error)`: If the provider type is not registered or creation fails
    pub fn create_provider(&self, config: &ProviderConfig) -> Result<NamedProvider> {
        let provider_type = config.type_name();
        let providers = self
            .providers
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let factory = providers
            .get(provider_type)
            .ok_or_else(|| Error::config(format!("Unknown provider type: {provider_type}")))?;

        let filters = ProviderFilters::from_config(&config.forward_filter, &config.reverse_filter);
        Ok(NamedProvider::new(&config.name, factory.create(config, filters)?))
    }

    /// Validate a configuration and build its controller
    pub fn build_controller(&self, config: &ZonepopConfig) -> Result<Controller> {
        config.validate()?;

        let sources = config
            .sources
            .iter()
            .map(|source| self.create_source(source))
            .collect::<Result<Vec<_>>>()?;
        let providers = config
            .providers
            .iter()
            .map(|provider| self.create_provider(provider))
            .collect::<Result<Vec<_>>>()?;

        Controller::from_config(sources, providers, &config.controller)
    }

    /// List all registered source types
    pub fn list_sources(&self) -> Vec<String> {
        let sources = self.sources.read().unwrap_or_else(PoisonError::into_inner);
        sources.keys().cloned().collect()
    }

    /// List all registered provider types
    pub fn list_providers(&self) -> Vec<String> {
        let providers = self
            .providers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        providers.keys().cloned().collect()
    }

    /// Check if a source type is registered
    pub fn has_source(&self, name: &str) -> bool {
        let sources = self.sources.read().unwrap_or_else(PoisonError::into_inner);
        sources.contains_key(name)
    }

    /// Check if a provider type is registered
    pub fn has_provider(&self, name: &str) -> bool {
        let providers = self
            .providers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        providers.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderKind;
    use crate::endpoint::Endpoint;
    use crate::traits::Provider;

    struct MockProviderFactory;

    impl ProviderFactory for MockProviderFactory {
        fn create(
            &self,
            _config: &ProviderConfig,
            _filters: ProviderFilters,
        ) -> Result<Box<dyn Provider>> {
            Err(Error::config("Mock provider not implemented"))
        }
    }

    #[test]
    fn test_registry_registration() {
        let registry = Registry::new();

        assert!(!registry.has_provider("mock"));
        registry.register_provider("mock", Box::new(MockProviderFactory));
        assert!(registry.has_provider("mock"));
        assert!(registry.list_providers().contains(&"mock".to_string()));
    }

    #[test]
    fn test_builtins_registered() {
        let registry = Registry::with_builtins();
        assert!(registry.has_source("static"));
        assert!(registry.has_provider("http_cache"));
        assert!(registry.has_provider("metrics"));
        assert!(!registry.has_provider("authoritative"));
    }

    #[test]
    fn test_unknown_type_is_config_error() {
        let registry = Registry::with_builtins();
        let config = ProviderConfig {
            name: "pigeon".to_string(),
            forward_filter: Default::default(),
            reverse_filter: Default::default(),
            kind: ProviderKind::Custom {
                factory: "carrier_pigeon".to_string(),
                config: serde_json::Value::Null,
            },
        };
        assert!(matches!(
            registry.create_provider(&config),
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_build_controller_wires_cache() {
        let registry = Registry::with_builtins();
        let config = ZonepopConfig::from_toml_str(
            r#"
[controller]
interval_secs = 30

[[sources]]
name = "lab"
type = "static"
endpoints = [{ hostname = "nas", ipv4s = ["192.0.2.10"] }]

[[providers]]
name = "cache"
type = "http_cache"
"#,
        )
        .unwrap();

        let controller = registry.build_controller(&config).unwrap();
        assert_eq!(controller.source_names(), vec!["lab"]);
        assert_eq!(controller.provider_names(), vec!["cache"]);

        controller
            .run_once(crate::controller::RunOptions::default())
            .await
            .unwrap();

        let published: Vec<Endpoint> =
            serde_json::from_str(&registry.endpoint_cache().forward()).unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].source_name(), Some("lab"));
    }
}
