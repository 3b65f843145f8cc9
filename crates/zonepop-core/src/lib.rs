// # zonepop-core
//
// Core library for the ZonePop DNS synchronizer.
//
// ## Architecture Overview
//
// This library provides the reconciliation core:
// - **Endpoint**: One hostname's addresses, TTL and property bags
// - **EndpointSource**: Trait for anything reporting the endpoints that should exist
// - **Provider**: Trait for sinks converging to the merged endpoint set
// - **ZoneClient**: Trait for remote authoritative zone APIs
// - **rdns**: Reverse-DNS arithmetic and the shared PTR planner
// - **Controller**: Scheduled passes, source gating, provider isolation
// - **Registry**: Plugin-based construction of sources and providers from config
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from implementations
// 2. **Plugin-Based**: Components are registered dynamically, no hard-coded if-else
// 3. **Library-First**: All core functionality can be used as a library
// 4. **Idempotency**: Providers upsert whole record sets, so repeated passes converge

pub mod builtin;
pub mod config;
pub mod controller;
pub mod endpoint;
pub mod error;
pub mod filter;
pub mod metrics;
pub mod rdns;
pub mod registry;
pub mod traits;

// Re-export core types for convenience
pub use config::{ProviderConfig, SourceConfig, ZonepopConfig};
pub use controller::{Controller, NamedProvider, NamedSource, RunOptions};
pub use endpoint::Endpoint;
pub use error::{Error, Result};
pub use filter::{EndpointFilter, ProviderFilters};
pub use registry::Registry;
pub use traits::{EndpointSource, Provider, ZoneClient};
