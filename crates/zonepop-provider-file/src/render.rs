//! File content rendering

use minijinja::{Environment, context};
use zonepop_core::config::{FileFormat, FileOutputConfig};
use zonepop_core::rdns::{dns_safe_name, ptr_records_for_endpoints};
use zonepop_core::{Endpoint, Error, Result};

/// Render one configured file
///
/// A configured template wins over the format. `hosts` and `json` files show
/// forward endpoints, `ptr` files show the reverse endpoints restricted to
/// the configured zone.
pub fn render(output: &FileOutputConfig, forward: &[&Endpoint], reverse: &[&Endpoint]) -> Result<String> {
    if let Some(template) = &output.template {
        return render_template(
            template,
            forward,
            reverse,
            output.zone.as_deref(),
            &output.record_suffix,
        );
    }
    match output.format {
        FileFormat::Hosts => Ok(render_hosts(forward, &output.record_suffix)),
        FileFormat::Json => Ok(serde_json::to_string_pretty(forward)? + "\n"),
        FileFormat::Ptr => render_ptr(reverse, output.zone.as_deref(), &output.record_suffix),
    }
}

fn environment<'source>() -> Environment<'source> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_keep_trailing_newline(true);
    env
}

/// Parse a template without rendering it
pub fn check_template(template: &str) -> std::result::Result<(), minijinja::Error> {
    environment().template_from_str(template).map(|_| ())
}

/// Render a user template
///
/// The context has `endpoints` (forward endpoints in wire form) and
/// `ptr_records` (`owner`, `target`, `addr`, `ttl`) planned from the
/// reverse endpoints.
pub fn render_template(
    template: &str,
    forward: &[&Endpoint],
    reverse: &[&Endpoint],
    zone: Option<&str>,
    record_suffix: &str,
) -> Result<String> {
    let ptr_records = ptr_records_for_endpoints(reverse.iter().copied(), None, zone, record_suffix)?;
    environment()
        .render_str(
            template,
            context! {
                endpoints => forward,
                ptr_records => ptr_records,
            },
        )
        .map_err(|e| Error::config(format!("Failed to render template: {e}")))
}

/// `<addr>\t<full hostname>` per address, IPv4 before IPv6
pub fn render_hosts(endpoints: &[&Endpoint], record_suffix: &str) -> String {
    let mut out = String::new();
    for endpoint in endpoints.iter().filter(|e| !e.hostname.is_empty()) {
        let full_hostname = dns_safe_name(&endpoint.hostname) + record_suffix;
        for addr in endpoint.ipv4s.iter().chain(&endpoint.ipv6s) {
            out.push_str(addr);
            out.push('\t');
            out.push_str(&full_hostname);
            out.push('\n');
        }
    }
    out
}

/// `<ptr>\tIN\tPTR\t<full hostname>` per planned PTR record
pub fn render_ptr(endpoints: &[&Endpoint], zone: Option<&str>, record_suffix: &str) -> Result<String> {
    let records = ptr_records_for_endpoints(endpoints.iter().copied(), None, zone, record_suffix)?;
    Ok(records
        .iter()
        .map(|record| format!("{}\tIN\tPTR\t{}\n", record.owner, record.target))
        .collect())
}
