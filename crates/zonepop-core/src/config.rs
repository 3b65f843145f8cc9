//! Configuration types for the ZonePop system
//!
//! This module defines all configuration structures used throughout the crate.
//! The on-disk format is TOML:
//!
//! ```toml
//! [controller]
//! interval_secs = 60
//!
//! [[sources]]
//! name = "lab"
//! type = "static"
//! endpoints = [{ hostname = "nas", ipv4s = ["192.0.2.10"], ttl = 300 }]
//!
//! [[providers]]
//! name = "pdns"
//! type = "authoritative"
//! api_url = "http://127.0.0.1:8081"
//! api_key_env = "PDNS_API_KEY"
//! forward_zone = { id = "lab.example.com." }
//! ipv4_reverse_zone = { id = "2.0.192.in-addr.arpa.", cleanup = true }
//! ```

use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Main ZonePop configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZonepopConfig {
    /// Controller settings
    #[serde(default)]
    pub controller: ControllerConfig,

    /// Endpoint sources, queried in this order
    #[serde(default)]
    pub sources: Vec<SourceConfig>,

    /// Providers, updated in this order
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

impl ZonepopConfig {
    /// Parse a TOML document
    pub fn from_toml_str(input: &str) -> Result<Self> {
        toml::from_str(input).map_err(|e| Error::config(format!("Invalid TOML: {e}")))
    }

    /// Read and parse a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.controller.validate()?;

        let mut seen = HashSet::new();
        for source in &self.sources {
            source.validate()?;
            if !seen.insert(source.name.as_str()) {
                return Err(Error::config(format!(
                    "Duplicate source name: {}",
                    source.name
                )));
            }
        }

        let mut seen = HashSet::new();
        for provider in &self.providers {
            provider.validate()?;
            if !seen.insert(provider.name.as_str()) {
                return Err(Error::config(format!(
                    "Duplicate provider name: {}",
                    provider.name
                )));
            }
        }

        Ok(())
    }
}

/// Controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Minimum time between two reconciliation passes (in seconds)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// How often the run loop checks whether a pass is due (in milliseconds)
    #[serde(default = "default_tick_millis")]
    pub tick_millis: u64,

    /// Query sources but never call providers
    #[serde(default)]
    pub dry_run: bool,
}

impl ControllerConfig {
    /// Validate the controller configuration
    pub fn validate(&self) -> Result<()> {
        if self.interval_secs == 0 {
            return Err(Error::config("Controller interval must be > 0"));
        }
        if self.tick_millis == 0 {
            return Err(Error::config("Controller tick must be > 0"));
        }
        Ok(())
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            tick_millis: default_tick_millis(),
            dry_run: false,
        }
    }
}

fn default_interval_secs() -> u64 {
    60
}

fn default_tick_millis() -> u64 {
    1000
}

/// One configured endpoint source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Unique name, stamped into every endpoint this source produces
    pub name: String,

    /// Source kind and its settings
    #[serde(flatten)]
    pub kind: SourceKind,
}

/// Endpoint source kinds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceKind {
    /// Fixed endpoint list
    Static {
        #[serde(default)]
        endpoints: Vec<Endpoint>,
    },

    /// JSON endpoint list fetched over HTTP
    Http {
        /// URL returning a JSON array of endpoints
        url: String,
        /// Request timeout in seconds
        #[serde(default = "default_http_timeout_secs")]
        timeout_secs: u64,
    },

    /// Externally registered source
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        #[serde(default)]
        config: serde_json::Value,
    },
}

fn default_http_timeout_secs() -> u64 {
    10
}

impl SourceConfig {
    /// Validate the source configuration
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::config("Source name cannot be empty"));
        }
        match &self.kind {
            SourceKind::Static { .. } => Ok(()),
            SourceKind::Http { url, timeout_secs } => {
                if url.is_empty() {
                    return Err(Error::config(format!(
                        "Source {}: HTTP URL cannot be empty",
                        self.name
                    )));
                }
                if *timeout_secs == 0 {
                    return Err(Error::config(format!(
                        "Source {}: HTTP timeout must be > 0",
                        self.name
                    )));
                }
                Ok(())
            }
            SourceKind::Custom { factory, .. } => {
                if factory.is_empty() {
                    return Err(Error::config(format!(
                        "Source {}: custom factory cannot be empty",
                        self.name
                    )));
                }
                Ok(())
            }
        }
    }

    /// Get the registry key for this source
    pub fn type_name(&self) -> &str {
        match &self.kind {
            SourceKind::Static { .. } => "static",
            SourceKind::Http { .. } => "http",
            SourceKind::Custom { factory, .. } => factory,
        }
    }
}

/// One configured provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Unique name, used in logs, metrics and errors
    pub name: String,

    /// Which endpoints get forward records
    #[serde(default)]
    pub forward_filter: FilterConfig,

    /// Which endpoints get reverse records
    #[serde(default)]
    pub reverse_filter: FilterConfig,

    /// Provider kind and its settings
    #[serde(flatten)]
    pub kind: ProviderKind,
}

/// Provider kinds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderKind {
    /// Authoritative DNS zones behind a remote API
    Authoritative(AuthoritativeConfig),

    /// Rendered local files
    File(FileProviderConfig),

    /// In-memory JSON snapshot served over HTTP
    HttpCache,

    /// Prometheus info series per endpoint
    Metrics(MetricsProviderConfig),

    /// Externally registered provider
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        #[serde(default)]
        config: serde_json::Value,
    },
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::config("Provider name cannot be empty"));
        }
        match &self.kind {
            ProviderKind::Authoritative(config) => config.validate(&self.name),
            ProviderKind::File(config) => config.validate(&self.name),
            ProviderKind::HttpCache => Ok(()),
            ProviderKind::Metrics(config) => config.validate(&self.name),
            ProviderKind::Custom { factory, .. } => {
                if factory.is_empty() {
                    return Err(Error::config(format!(
                        "Provider {}: custom factory cannot be empty",
                        self.name
                    )));
                }
                Ok(())
            }
        }
    }

    /// Get the registry key for this provider
    pub fn type_name(&self) -> &str {
        match &self.kind {
            ProviderKind::Authoritative(_) => "authoritative",
            ProviderKind::File(_) => "file",
            ProviderKind::HttpCache => "http_cache",
            ProviderKind::Metrics(_) => "metrics",
            ProviderKind::Custom { factory, .. } => factory,
        }
    }
}

/// Declarative endpoint filter
///
/// All non-empty criteria must hold. An empty filter accepts everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Only endpoints produced by one of these sources
    #[serde(default)]
    pub include_sources: Vec<String>,

    /// Never endpoints produced by one of these sources
    #[serde(default)]
    pub exclude_sources: Vec<String>,

    /// Only endpoints with a non-empty hostname
    #[serde(default)]
    pub require_hostname: bool,

    /// Only endpoints whose source properties carry these exact values
    #[serde(default)]
    pub source_properties: BTreeMap<String, serde_json::Value>,
}

impl FilterConfig {
    /// Whether this filter has no criteria at all
    pub fn is_empty(&self) -> bool {
        self.include_sources.is_empty()
            && self.exclude_sources.is_empty()
            && !self.require_hostname
            && self.source_properties.is_empty()
    }
}

/// Settings of one zone managed by the authoritative provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneSettings {
    /// Zone identifier in the remote API
    pub id: String,

    /// Zone DNS name; looked up from the API on first use when absent
    #[serde(default)]
    pub name: Option<String>,

    /// Delete records of this zone's types not justified by the current pass
    #[serde(default)]
    pub cleanup: bool,
}

/// Authoritative DNS provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthoritativeConfig {
    /// Base URL of the zone API (e.g. `http://127.0.0.1:8081`)
    pub api_url: String,

    /// Server identifier within the API
    #[serde(default = "default_server_id")]
    pub server_id: String,

    /// Name of the environment variable holding the API key
    pub api_key_env: String,

    /// Record sets per listing page during cleanup
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Request timeout in seconds
    #[serde(default = "default_api_timeout_secs")]
    pub timeout_secs: u64,

    /// Suffix appended to hostnames; defaults to `.` + forward zone name
    #[serde(default)]
    pub record_suffix: Option<String>,

    /// Zone receiving A/AAAA records
    #[serde(default)]
    pub forward_zone: Option<ZoneSettings>,

    /// Zone receiving IPv4 PTR records
    #[serde(default)]
    pub ipv4_reverse_zone: Option<ZoneSettings>,

    /// Zone receiving IPv6 PTR records
    #[serde(default)]
    pub ipv6_reverse_zone: Option<ZoneSettings>,
}

fn default_server_id() -> String {
    "localhost".to_string()
}

fn default_page_size() -> usize {
    100
}

fn default_api_timeout_secs() -> u64 {
    30
}

impl AuthoritativeConfig {
    /// Validate the authoritative provider configuration
    pub fn validate(&self, provider: &str) -> Result<()> {
        if self.api_url.is_empty() {
            return Err(Error::config(format!(
                "Provider {provider}: api_url cannot be empty"
            )));
        }
        if self.api_key_env.is_empty() {
            return Err(Error::config(format!(
                "Provider {provider}: api_key_env cannot be empty"
            )));
        }
        if self.page_size == 0 {
            return Err(Error::config(format!(
                "Provider {provider}: page_size must be > 0"
            )));
        }
        for (label, zone) in [
            ("forward_zone", &self.forward_zone),
            ("ipv4_reverse_zone", &self.ipv4_reverse_zone),
            ("ipv6_reverse_zone", &self.ipv6_reverse_zone),
        ] {
            if zone.as_ref().is_some_and(|z| z.id.is_empty()) {
                return Err(Error::config(format!(
                    "Provider {provider}: {label}.id cannot be empty"
                )));
            }
        }
        Ok(())
    }
}

/// File provider configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileProviderConfig {
    /// Files rendered on every pass
    #[serde(default)]
    pub files: Vec<FileOutputConfig>,
}

impl FileProviderConfig {
    /// Validate the file provider configuration
    pub fn validate(&self, provider: &str) -> Result<()> {
        for file in &self.files {
            file.validate(provider)?;
        }
        Ok(())
    }
}

/// One rendered file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOutputConfig {
    /// Destination path
    #[serde(default)]
    pub filename: String,

    /// Rendering format, used when no template is given
    #[serde(default)]
    pub format: FileFormat,

    /// Jinja template over `endpoints` (forward) and `ptr_records` (reverse)
    #[serde(default)]
    pub template: Option<String>,

    /// Suffix appended to hostnames
    #[serde(default)]
    pub record_suffix: String,

    /// Reverse zone restricting PTR output
    #[serde(default)]
    pub zone: Option<String>,

    /// Octal file mode
    #[serde(default = "default_permissions")]
    pub permissions: String,
}

fn default_permissions() -> String {
    "0644".to_string()
}

impl FileOutputConfig {
    /// Validate one file entry
    pub fn validate(&self, provider: &str) -> Result<()> {
        if self.filename.is_empty() {
            return Err(Error::config(format!(
                "Provider {provider}: filename not specified"
            )));
        }
        self.mode().map_err(|_| {
            Error::config(format!(
                "Provider {provider}: invalid permissions {:?} for {}",
                self.permissions, self.filename
            ))
        })?;
        if let Some(zone) = &self.zone {
            crate::rdns::determine_reverse_zone_kind(zone).map_err(|e| {
                Error::config(format!("Provider {provider}: {}: {e}", self.filename))
            })?;
        }
        Ok(())
    }

    /// Parsed octal file mode
    pub fn mode(&self) -> std::result::Result<u32, std::num::ParseIntError> {
        u32::from_str_radix(self.permissions.trim_start_matches("0o"), 8)
    }
}

/// Rendering formats of the file provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    /// `/etc/hosts` style lines of forward endpoints
    #[default]
    Hosts,
    /// JSON array of forward endpoints
    Json,
    /// Zone-file PTR lines of reverse endpoints
    Ptr,
}

/// Metrics provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsProviderConfig {
    /// Metric namespace
    #[serde(default = "default_metrics_namespace")]
    pub namespace: String,

    /// Metric subsystem
    #[serde(default = "default_metrics_subsystem")]
    pub subsystem: String,

    /// Source property keys exported as labels
    #[serde(default)]
    pub source_labels: Vec<String>,

    /// Provider property keys exported as labels
    #[serde(default)]
    pub provider_labels: Vec<String>,
}

fn default_metrics_namespace() -> String {
    "zonepop".to_string()
}

fn default_metrics_subsystem() -> String {
    "provider".to_string()
}

impl Default for MetricsProviderConfig {
    fn default() -> Self {
        Self {
            namespace: default_metrics_namespace(),
            subsystem: default_metrics_subsystem(),
            source_labels: Vec::new(),
            provider_labels: Vec::new(),
        }
    }
}

impl MetricsProviderConfig {
    /// Validate the metrics provider configuration
    pub fn validate(&self, provider: &str) -> Result<()> {
        if self.namespace.is_empty() || self.subsystem.is_empty() {
            return Err(Error::config(format!(
                "Provider {provider}: metrics namespace and subsystem cannot be empty"
            )));
        }
        Ok(())
    }
}
