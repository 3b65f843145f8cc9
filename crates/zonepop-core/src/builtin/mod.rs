//! Components that ship with the core
//!
//! - [`StaticSource`]: a fixed endpoint list from configuration
//! - [`HttpCacheProvider`]: JSON snapshot of forward endpoints for HTTP readers
//! - [`MetricsProvider`]: one Prometheus info series per endpoint address

pub mod http_cache;
pub mod metrics_provider;
pub mod static_source;

pub use http_cache::{EndpointCache, HttpCacheFactory, HttpCacheProvider};
pub use metrics_provider::{EndpointSeries, MetricsProvider, MetricsProviderFactory};
pub use static_source::{StaticSource, StaticSourceFactory};
