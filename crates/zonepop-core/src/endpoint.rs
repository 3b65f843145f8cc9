//! The endpoint data model
//!
//! An [`Endpoint`] is one DNS-record-worthy fact emitted by a source: a
//! hostname, its addresses and a preferred TTL. Endpoints are built fresh on
//! every reconciliation pass and discarded afterwards.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Key stamped into [`Endpoint::source_properties`] with the configured name
/// of the source that produced the endpoint.
pub const SOURCE_PROPERTY: &str = "source";

/// A host configuration emitted from a source
///
/// The JSON form (`hostname`, `ipv4s`, `ipv6s`, `ttl`, `source_properties`,
/// `provider_properties`) is also the wire format of the HTTP cache provider
/// and the HTTP source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Hostname; empty means "generate one from the address" downstream
    #[serde(default)]
    pub hostname: String,

    /// IPv4 addresses for A record creation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ipv4s: Vec<String>,

    /// IPv6 addresses for AAAA record creation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ipv6s: Vec<String>,

    /// Preferred TTL in seconds; 0 means unset and is passed through as-is
    #[serde(default, rename = "ttl", skip_serializing_if = "is_zero")]
    pub record_ttl: i64,

    /// Additional key/value pairs from the source
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub source_properties: BTreeMap<String, Value>,

    /// Additional key/value pairs for providers
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub provider_properties: BTreeMap<String, Value>,
}

fn is_zero(ttl: &i64) -> bool {
    *ttl == 0
}

impl Endpoint {
    /// Create an endpoint with only a hostname set
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            ..Default::default()
        }
    }

    /// Add an IPv4 address
    pub fn with_ipv4(mut self, addr: impl Into<String>) -> Self {
        self.ipv4s.push(addr.into());
        self
    }

    /// Add an IPv6 address
    pub fn with_ipv6(mut self, addr: impl Into<String>) -> Self {
        self.ipv6s.push(addr.into());
        self
    }

    /// Set the record TTL
    pub fn with_ttl(mut self, ttl: i64) -> Self {
        self.record_ttl = ttl;
        self
    }

    /// Set a source property
    pub fn with_source_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.source_properties.insert(key.into(), value.into());
        self
    }

    /// Set a provider property
    pub fn with_provider_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.provider_properties.insert(key.into(), value.into());
        self
    }

    /// Whether the endpoint carries any address at all
    pub fn has_addresses(&self) -> bool {
        !self.ipv4s.is_empty() || !self.ipv6s.is_empty()
    }

    /// Name of the source that produced this endpoint, if stamped
    pub fn source_name(&self) -> Option<&str> {
        self.source_properties
            .get(SOURCE_PROPERTY)
            .and_then(Value::as_str)
    }

    /// Stamp the producing source's name into the source properties
    pub fn stamp_source(&mut self, name: &str) {
        self.source_properties
            .insert(SOURCE_PROPERTY.to_string(), Value::String(name.to_string()));
    }
}

/// Render a property value for use in labels and log fields
///
/// Strings are rendered without JSON quoting.
pub fn property_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
