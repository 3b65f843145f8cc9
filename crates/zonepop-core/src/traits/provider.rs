// # Provider Trait
//
// Defines the interface for sinks that converge some remote state to match
// the endpoint set of a reconciliation pass.
//
// ## Implementations
//
// - Authoritative DNS zones: `zonepop-provider-authoritative` crate
// - Local files: `zonepop-provider-file` crate
// - In-process: `zonepop_core::builtin::{HttpCacheProvider, MetricsProvider}`

use async_trait::async_trait;

use crate::config::ProviderConfig;
use crate::endpoint::Endpoint;
use crate::filter::ProviderFilters;

/// Trait for provider implementations
///
/// Every provider receives the full merged endpoint list of a pass and
/// applies its own forward/reverse filters.
///
/// # Idempotency
///
/// Calling [`Provider::update_endpoints`] twice with the same input must
/// converge to the same remote state without duplicate records.
///
/// # Failure
///
/// Errors are reported once and returned. The controller isolates each
/// provider, so a failure here never blocks other providers; the next
/// scheduled pass retries naturally.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Converge remote state to the given endpoints
    async fn update_endpoints(&self, endpoints: &[Endpoint]) -> Result<(), crate::Error>;
}

/// Helper trait for constructing providers from configuration
pub trait ProviderFactory: Send + Sync {
    /// Create a Provider instance from configuration
    ///
    /// # Parameters
    ///
    /// - `config`: Configuration of this provider instance
    /// - `filters`: Forward and reverse filters compiled from the same config
    fn create(
        &self,
        config: &ProviderConfig,
        filters: ProviderFilters,
    ) -> Result<Box<dyn Provider>, crate::Error>;
}
