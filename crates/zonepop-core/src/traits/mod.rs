//! Core traits for the ZonePop system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`EndpointSource`]: Report the endpoints that should exist
//! - [`Provider`]: Converge a sink to the merged endpoint set
//! - [`ZoneClient`]: Remote authoritative zone API used by DNS providers

pub mod provider;
pub mod source;
pub mod zone_client;

pub use provider::{Provider, ProviderFactory};
pub use source::{EndpointSource, SourceFactory};
pub use zone_client::{
    Change, ChangeAction, PageCursor, RecordPage, RecordSet, RecordType, ZoneClient,
};
