//! Architectural Contract Test: File Provider
//!
//! This test verifies what the file provider puts on disk.
//!
//! Constraints verified:
//! - Each configured file is rendered in its own format
//! - Forward and reverse filters select independent endpoint sets
//! - Rendering errors leave existing files untouched
//! - A missing filename is rejected at construction
//! - Repeated updates produce identical files
//!
//! If this test fails, local consumers read stale or half-written files.

use std::path::Path;
use tempfile::tempdir;
use tokio_test::{assert_err, assert_ok};
use zonepop_core::config::{
    FileFormat, FileOutputConfig, FileProviderConfig, FilterConfig, ProviderConfig, ProviderKind,
};
use zonepop_core::{Endpoint, Error, Provider, ProviderFilters, Registry};
use zonepop_provider_file::{FileProvider, register};

fn output(path: &Path, format: FileFormat) -> FileOutputConfig {
    FileOutputConfig {
        filename: path.display().to_string(),
        format,
        template: None,
        record_suffix: ".lan.".to_string(),
        zone: None,
        permissions: "0644".to_string(),
    }
}

fn stamped(endpoint: Endpoint, source: &str) -> Endpoint {
    let mut endpoint = endpoint;
    endpoint.stamp_source(source);
    endpoint
}

#[tokio::test]
async fn renders_every_configured_file() {
    let dir = tempdir().unwrap();
    let hosts = dir.path().join("hosts");
    let json = dir.path().join("endpoints.json");
    let ptr = dir.path().join("db.192.0.2");

    let config = FileProviderConfig {
        files: vec![
            output(&hosts, FileFormat::Hosts),
            output(&json, FileFormat::Json),
            FileOutputConfig {
                zone: Some("2.0.192.in-addr.arpa.".to_string()),
                ..output(&ptr, FileFormat::Ptr)
            },
        ],
    };
    let provider = FileProvider::new("files", config, ProviderFilters::default()).unwrap();

    let endpoints = vec![
        Endpoint::new("nas").with_ipv4("192.0.2.10").with_ipv6("2001:db8::10"),
        Endpoint::new("router").with_ipv4("203.0.113.1"),
    ];
    assert_ok!(provider.update_endpoints(&endpoints).await);

    assert_eq!(
        std::fs::read_to_string(&hosts).unwrap(),
        "192.0.2.10\tnas.lan.\n2001:db8::10\tnas.lan.\n203.0.113.1\trouter.lan.\n"
    );
    let parsed: Vec<Endpoint> =
        serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
    assert_eq!(parsed, endpoints);
    assert_eq!(
        std::fs::read_to_string(&ptr).unwrap(),
        "10.2.0.192.in-addr.arpa.\tIN\tPTR\tnas.lan.\n"
    );
}

#[tokio::test]
async fn filters_select_independent_sets() {
    let dir = tempdir().unwrap();
    let hosts = dir.path().join("hosts");
    let ptr = dir.path().join("ptr");

    let config = FileProviderConfig {
        files: vec![output(&hosts, FileFormat::Hosts), output(&ptr, FileFormat::Ptr)],
    };
    let filters = ProviderFilters::from_config(
        &FilterConfig {
            include_sources: vec!["static".to_string()],
            ..FilterConfig::default()
        },
        &FilterConfig {
            include_sources: vec!["dhcp".to_string()],
            ..FilterConfig::default()
        },
    );
    let provider = FileProvider::new("files", config, filters).unwrap();

    let endpoints = vec![
        stamped(Endpoint::new("nas").with_ipv4("192.0.2.10"), "static"),
        stamped(Endpoint::new("laptop").with_ipv4("192.0.2.50"), "dhcp"),
    ];
    assert_ok!(provider.update_endpoints(&endpoints).await);

    assert_eq!(std::fs::read_to_string(&hosts).unwrap(), "192.0.2.10\tnas.lan.\n");
    assert_eq!(
        std::fs::read_to_string(&ptr).unwrap(),
        "50.2.0.192.in-addr.arpa.\tIN\tPTR\tlaptop.lan.\n"
    );
}

#[tokio::test]
async fn render_error_writes_nothing() {
    let dir = tempdir().unwrap();
    let hosts = dir.path().join("hosts");
    let ptr = dir.path().join("ptr");
    std::fs::write(&hosts, "previous\n").unwrap();

    let config = FileProviderConfig {
        files: vec![output(&hosts, FileFormat::Hosts), output(&ptr, FileFormat::Ptr)],
    };
    let provider = FileProvider::new("files", config, ProviderFilters::default()).unwrap();

    let endpoints = vec![Endpoint::new("broken").with_ipv4("256.999.24.2")];
    let err = assert_err!(provider.update_endpoints(&endpoints).await);

    assert!(matches!(err, Error::InvalidAddress(_)));
    assert_eq!(std::fs::read_to_string(&hosts).unwrap(), "previous\n");
    assert!(!ptr.exists());
}

#[tokio::test]
async fn repeated_updates_are_identical() {
    let dir = tempdir().unwrap();
    let hosts = dir.path().join("hosts");
    let config = FileProviderConfig {
        files: vec![output(&hosts, FileFormat::Hosts)],
    };
    let provider = FileProvider::new("files", config, ProviderFilters::default()).unwrap();
    let endpoints = vec![Endpoint::new("nas").with_ipv4("192.0.2.10")];

    assert_ok!(provider.update_endpoints(&endpoints).await);
    let first = std::fs::read_to_string(&hosts).unwrap();
    assert_ok!(provider.update_endpoints(&endpoints).await);

    assert_eq!(std::fs::read_to_string(&hosts).unwrap(), first);
}

#[tokio::test]
async fn template_renders_both_directions() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dnsmasq.conf");
    let config = FileProviderConfig {
        files: vec![FileOutputConfig {
            template: Some(
                "{% for e in endpoints %}\
                 {% for a in e.ipv4s %}address=/{{ e.hostname }}.lan/{{ a }}\n{% endfor %}\
                 {% endfor %}\
                 {% for r in ptr_records %}ptr-record={{ r.owner }},{{ r.target }}\n{% endfor %}"
                    .to_string(),
            ),
            zone: Some("2.0.192.in-addr.arpa.".to_string()),
            ..output(&path, FileFormat::Hosts)
        }],
    };
    let filters = ProviderFilters::from_config(
        &FilterConfig::default(),
        &FilterConfig {
            include_sources: vec!["dhcp".to_string()],
            ..FilterConfig::default()
        },
    );
    let provider = FileProvider::new("files", config, filters).unwrap();

    let endpoints = vec![
        stamped(Endpoint::new("nas").with_ipv4("192.0.2.10"), "static"),
        stamped(Endpoint::new("laptop").with_ipv4("192.0.2.50"), "dhcp"),
    ];
    assert_ok!(provider.update_endpoints(&endpoints).await);

    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "address=/nas.lan/192.0.2.10\n\
         address=/laptop.lan/192.0.2.50\n\
         ptr-record=50.2.0.192.in-addr.arpa.,laptop.lan.\n"
    );
}

#[test]
fn broken_template_is_rejected() {
    let config = FileProviderConfig {
        files: vec![FileOutputConfig {
            template: Some("{% for e in endpoints %}".to_string()),
            ..output(Path::new("hosts"), FileFormat::Hosts)
        }],
    };
    let err = FileProvider::new("files", config, ProviderFilters::default()).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert!(err.to_string().contains("invalid template for hosts"));
}

#[test]
fn missing_filename_is_rejected() {
    let config = FileProviderConfig {
        files: vec![FileOutputConfig {
            filename: String::new(),
            ..output(Path::new("unused"), FileFormat::Hosts)
        }],
    };
    let err = FileProvider::new("files", config, ProviderFilters::default()).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert!(err.to_string().contains("filename not specified"));
}

#[test]
fn registry_builds_file_provider() {
    let registry = Registry::with_builtins();
    register(&registry);

    let dir = tempdir().unwrap();
    let config = ProviderConfig {
        name: "files".to_string(),
        forward_filter: FilterConfig::default(),
        reverse_filter: FilterConfig::default(),
        kind: ProviderKind::File(FileProviderConfig {
            files: vec![output(&dir.path().join("hosts"), FileFormat::Hosts)],
        }),
    };

    let provider = registry.create_provider(&config).unwrap();
    assert_eq!(provider.name, "files");
}
