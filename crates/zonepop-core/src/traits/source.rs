// # Endpoint Source Trait
//
// Defines the interface for anything that can report the hosts that should
// exist in DNS right now.
//
// ## Implementations
//
// - Static list: `zonepop_core::builtin::StaticSource`
// - HTTP JSON feed: `zonepop-source-http` crate
// - Future: router lease tables, DHCP servers, inventory systems
//
// ## Usage
//
// ```rust,ignore
// use zonepop_core::EndpointSource;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* EndpointSource implementation */;
//
//     for endpoint in source.endpoints().await? {
//         println!("{} -> {:?}", endpoint.hostname, endpoint.ipv4s);
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::config::SourceConfig;
use crate::endpoint::Endpoint;

/// Trait for endpoint source implementations
///
/// A source is asked for its complete endpoint list once per reconciliation
/// pass. The controller keeps no state between calls, so implementations
/// must be safe to call repeatedly.
///
/// # Failure
///
/// A source that fails outright returns its error. A source that fails
/// after collecting some endpoints may return [`crate::Error::partial`] so
/// the collected endpoints still show up in the pass's logs and metrics.
/// Either way the controller gates every provider for that pass.
///
/// # Forbidden Capabilities
/// - ❌ Retry internally (the next scheduled pass is the retry)
/// - ❌ Stamp the `source` property (the controller owns provenance)
/// - ❌ Talk to providers
#[async_trait]
pub trait EndpointSource: Send + Sync {
    /// Produce the endpoints for this pass
    async fn endpoints(&self) -> Result<Vec<Endpoint>, crate::Error>;
}

/// Helper trait for constructing endpoint sources from configuration
pub trait SourceFactory: Send + Sync {
    /// Create an EndpointSource instance from configuration
    fn create(&self, config: &SourceConfig) -> Result<Box<dyn EndpointSource>, crate::Error>;
}
