// # Authoritative DNS Provider
//
// This crate keeps authoritative DNS zones in step with the endpoint set:
// A/AAAA records in a forward zone, PTR records in an IPv4 and an IPv6
// reverse zone.
//
// ## Behavior
//
// - Forward records are grouped by hostname, addresses deduplicated per
//   family, one upsert per record set
// - PTR records come from the shared planner in `zonepop_core::rdns`, first
//   claim of an owner name wins
// - Each zone gets at most one change batch per update, never an empty one
// - Optional per-zone cleanup deletes records no endpoint accounts for
// - Zone names are resolved once per provider lifetime
// - NO retries: the controller's next pass retries naturally
//
// ## Remote API
//
// The provider is generic over `ZoneClient`. The factory registered here
// wires it to the PowerDNS Authoritative HTTP API (`powerdns` module).
//
// ## Security Requirements
//
// - API key NEVER appears in logs
// - API key MUST be provided via the environment variable named by `api_key_env`
// - Factory MUST fail fast if the key is missing or empty

pub mod cleanup;
pub mod powerdns;
pub mod provider;

pub use cleanup::cleanup_zone;
pub use powerdns::PowerDnsZoneClient;
pub use provider::AuthoritativeProvider;

use zonepop_core::config::{ProviderConfig, ProviderKind};
use zonepop_core::traits::{Provider, ProviderFactory};
use zonepop_core::{Error, ProviderFilters, Registry, Result};

/// Factory for creating authoritative providers backed by PowerDNS
pub struct AuthoritativeFactory;

impl ProviderFactory for AuthoritativeFactory {
    fn create(&self, config: &ProviderConfig, filters: ProviderFilters) -> Result<Box<dyn Provider>> {
        let ProviderKind::Authoritative(settings) = &config.kind else {
            return Err(Error::config(format!(
                "Invalid config for authoritative provider {}",
                config.name
            )));
        };
        settings.validate(&config.name)?;

        let api_key = std::env::var(&settings.api_key_env).map_err(|_| {
            Error::config(format!(
                "Provider {}: environment variable {} is not set",
                config.name, settings.api_key_env
            ))
        })?;
        let client = PowerDnsZoneClient::from_config(settings, api_key)?;

        tracing::debug!(provider = %config.name, api_url = %settings.api_url, "Created authoritative provider");
        Ok(Box::new(AuthoritativeProvider::from_config(
            config.name.clone(),
            client,
            settings,
            filters,
        )))
    }
}

/// Register the authoritative provider with a registry
///
/// # Example
///
/// ```rust
/// use zonepop_core::Registry;
///
/// let registry = Registry::with_builtins();
/// zonepop_provider_authoritative::register(&registry);
/// assert!(registry.has_provider("authoritative"));
/// ```
pub fn register(registry: &Registry) {
    registry.register_provider("authoritative", Box::new(AuthoritativeFactory));
}
