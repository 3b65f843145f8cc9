//! Reverse-DNS arithmetic
//!
//! Pure functions for address families, reverse owner names and partial
//! (delegated) reverse zones, plus the PTR planner shared by every provider
//! that writes reverse records.
//!
//! Zone names are compared case-insensitively and with a normalized trailing
//! dot, so `0.192.in-addr.arpa` and `0.192.IN-ADDR.ARPA.` are the same zone.

use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use tracing::{info, warn};

/// IPv4 reverse lookup namespace
pub const IPV4_REVERSE_SUFFIX: &str = "in-addr.arpa.";

/// IPv6 reverse lookup namespace
pub const IPV6_REVERSE_SUFFIX: &str = "ip6.arpa.";

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Address family of an IP literal or a reverse zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressKind {
    Ipv4,
    Ipv6,
}

impl AddressKind {
    /// Reverse namespace suffix for this family
    pub fn reverse_suffix(self) -> &'static str {
        match self {
            AddressKind::Ipv4 => IPV4_REVERSE_SUFFIX,
            AddressKind::Ipv6 => IPV6_REVERSE_SUFFIX,
        }
    }

    /// Addresses of this family listed on an endpoint
    pub fn addresses(self, endpoint: &Endpoint) -> &[String] {
        match self {
            AddressKind::Ipv4 => &endpoint.ipv4s,
            AddressKind::Ipv6 => &endpoint.ipv6s,
        }
    }
}

impl fmt::Display for AddressKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressKind::Ipv4 => f.write_str("IPv4"),
            AddressKind::Ipv6 => f.write_str("IPv6"),
        }
    }
}

fn parse_addr(addr: &str) -> Result<IpAddr> {
    addr.trim()
        .parse::<IpAddr>()
        .map(|ip| ip.to_canonical())
        .map_err(|_| Error::invalid_address(format!("failed to parse address {addr:?}")))
}

/// Lowercase a DNS name and make sure it ends with exactly one dot
pub fn normalize_name(name: &str) -> String {
    let trimmed = name.trim().trim_end_matches('.');
    let mut normalized = trimmed.to_ascii_lowercase();
    normalized.push('.');
    normalized
}

/// Determine whether an address is IPv4 or IPv6
///
/// IPv4-mapped IPv6 literals (`::ffff:192.0.2.1`) are treated as IPv4.
pub fn determine_address_kind(addr: &str) -> Result<AddressKind> {
    match parse_addr(addr)? {
        IpAddr::V4(_) => Ok(AddressKind::Ipv4),
        IpAddr::V6(_) => Ok(AddressKind::Ipv6),
    }
}

/// Whether a zone name lies in either reverse lookup namespace
pub fn is_reverse_zone(zone_name: &str) -> bool {
    reverse_zone_kind(&normalize_name(zone_name)).is_some()
}

fn reverse_zone_kind(normalized: &str) -> Option<AddressKind> {
    [AddressKind::Ipv4, AddressKind::Ipv6]
        .into_iter()
        .find(|kind| {
            let suffix = kind.reverse_suffix();
            normalized == suffix
                || normalized
                    .strip_suffix(suffix)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
}

/// Determine which address family a reverse zone serves
pub fn determine_reverse_zone_kind(zone_name: &str) -> Result<AddressKind> {
    reverse_zone_kind(&normalize_name(zone_name)).ok_or_else(|| {
        Error::invalid_zone(format!("{zone_name:?} is not a reverse lookup zone"))
    })
}

/// Compute the PTR owner name of an address
///
/// IPv6 addresses are fully expanded to 32 nibbles before reversal.
pub fn reverse_addr(addr: &str) -> Result<String> {
    Ok(match parse_addr(addr)? {
        IpAddr::V4(ip) => reverse_ipv4(ip),
        IpAddr::V6(ip) => reverse_ipv6(ip),
    })
}

fn reverse_ipv4(ip: Ipv4Addr) -> String {
    let [a, b, c, d] = ip.octets();
    format!("{d}.{c}.{b}.{a}.{IPV4_REVERSE_SUFFIX}")
}

fn reverse_ipv6(ip: Ipv6Addr) -> String {
    let mut name = String::with_capacity(32 * 2 + IPV6_REVERSE_SUFFIX.len());
    for byte in ip.octets().iter().rev() {
        name.push(HEX_DIGITS[usize::from(byte & 0x0f)] as char);
        name.push('.');
        name.push(HEX_DIGITS[usize::from(byte >> 4)] as char);
        name.push('.');
    }
    name.push_str(IPV6_REVERSE_SUFFIX);
    name
}

/// Whether an address belongs to a (possibly partial) reverse zone
///
/// The zone owns the address when the zone's labels are a suffix of the
/// address's reverse owner name, so `0.192.in-addr.arpa.` owns `192.0.2.69`
/// but not `203.0.113.69`. Fails for a malformed address, a name outside
/// the reverse namespaces, or a zone of the other address family.
pub fn fits_in_reverse_zone(addr: &str, zone_name: &str) -> Result<bool> {
    let addr_kind = determine_address_kind(addr)?;
    let zone = normalize_name(zone_name);
    let zone_kind = reverse_zone_kind(&zone).ok_or_else(|| {
        Error::invalid_zone(format!("{zone_name:?} is not a reverse lookup zone"))
    })?;
    if zone_kind != addr_kind {
        return Err(Error::invalid_zone(format!(
            "zone {zone_name:?} is an {zone_kind} reverse zone, address {addr:?} is {addr_kind}"
        )));
    }

    let zone_labels: Vec<&str> = zone
        .strip_suffix(zone_kind.reverse_suffix())
        .unwrap_or_default()
        .split('.')
        .filter(|label| !label.is_empty())
        .collect();

    let ptr = reverse_addr(addr)?;
    let addr_labels: Vec<&str> = ptr
        .strip_suffix(addr_kind.reverse_suffix())
        .unwrap_or_default()
        .split('.')
        .filter(|label| !label.is_empty())
        .collect();

    if zone_labels.len() > addr_labels.len() {
        return Ok(false);
    }
    Ok(addr_labels.ends_with(&zone_labels))
}

/// Replace whitespace runs in an externally supplied hostname with `-`
pub fn dns_safe_name(name: &str) -> String {
    let mut safe = String::with_capacity(name.len());
    let mut in_whitespace = false;
    for c in name.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                safe.push('-');
            }
            in_whitespace = true;
        } else {
            safe.push(c);
            in_whitespace = false;
        }
    }
    safe
}

/// Hostname synthesized for an address when an endpoint has none
pub fn generated_hostname(addr: &str) -> String {
    format!("ip-{}", addr.trim().replace(['.', ':'], "-"))
}

/// One planned reverse record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PtrRecord {
    /// PTR owner name, e.g. `69.2.0.192.in-addr.arpa.`
    pub owner: String,
    /// Full hostname the record points to, suffix applied
    pub target: String,
    /// Address the owner name was computed from
    pub addr: String,
    /// TTL of the endpoint that claimed the owner name
    pub ttl: i64,
}

/// Plan PTR records for a list of endpoints
///
/// Endpoints are visited in input order and addresses in list order; the
/// first endpoint to claim an owner name keeps it and later claims are
/// dropped with a warning. Endpoints without a hostname get one generated
/// from each address.
///
/// `family` restricts which address lists are visited (`None` visits IPv4
/// then IPv6). When `zone` is given only addresses of the zone's family are
/// visited, and addresses outside the zone are skipped with a warning.
///
/// Malformed addresses and malformed zones are errors.
pub fn ptr_records_for_endpoints<'a>(
    endpoints: impl IntoIterator<Item = &'a Endpoint>,
    family: Option<AddressKind>,
    zone: Option<&str>,
    record_suffix: &str,
) -> Result<Vec<PtrRecord>> {
    let family = match zone {
        Some(zone) => Some(determine_reverse_zone_kind(zone)?),
        None => family,
    };
    let families: &[AddressKind] = match family {
        Some(AddressKind::Ipv4) => &[AddressKind::Ipv4],
        Some(AddressKind::Ipv6) => &[AddressKind::Ipv6],
        None => &[AddressKind::Ipv4, AddressKind::Ipv6],
    };

    let mut claimed: HashMap<String, String> = HashMap::new();
    let mut records = Vec::new();

    for endpoint in endpoints {
        for kind in families {
            for addr in kind.addresses(endpoint) {
                let hostname = if endpoint.hostname.is_empty() {
                    let generated = generated_hostname(addr);
                    info!(
                        addr = %addr,
                        hostname = %generated,
                        "No hostname defined for endpoint, using generated hostname"
                    );
                    generated
                } else {
                    endpoint.hostname.clone()
                };
                let full_hostname = dns_safe_name(&hostname) + record_suffix;

                if let Some(zone) = zone {
                    if !fits_in_reverse_zone(addr, zone)? {
                        warn!(
                            addr = %addr,
                            zone = %zone,
                            hostname = %hostname,
                            "{kind} address does not fit in reverse zone, skipping"
                        );
                        continue;
                    }
                }

                let ptr = reverse_addr(addr)?;
                if let Some(existing) = claimed.get(&ptr) {
                    warn!(
                        ptr = %ptr,
                        addr = %addr,
                        hostname = %hostname,
                        existing = %existing,
                        "PTR already claimed by another hostname, skipping"
                    );
                    continue;
                }
                claimed.insert(ptr.clone(), full_hostname.clone());
                records.push(PtrRecord {
                    owner: ptr,
                    target: full_hostname,
                    addr: addr.clone(),
                    ttl: endpoint.record_ttl,
                });
            }
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_determine_address_kind() {
        assert_eq!(determine_address_kind("192.0.2.1").unwrap(), AddressKind::Ipv4);
        assert_eq!(determine_address_kind("2001:db8::1").unwrap(), AddressKind::Ipv6);
        assert_eq!(determine_address_kind("::ffff:192.0.2.1").unwrap(), AddressKind::Ipv4);
        assert!(matches!(
            determine_address_kind("256.999.24.2"),
            Err(Error::InvalidAddress(_))
        ));
        assert!(matches!(
            determine_address_kind("ffff::ffff::ffff"),
            Err(Error::InvalidAddress(_))
        ));
        assert!(determine_address_kind("").is_err());
    }

    #[test]
    fn test_is_reverse_zone() {
        assert!(is_reverse_zone("0.192.in-addr.arpa."));
        assert!(is_reverse_zone("0.192.in-addr.arpa"));
        assert!(is_reverse_zone("8.b.d.0.1.0.0.2.IP6.ARPA."));
        assert!(is_reverse_zone("in-addr.arpa."));
        assert!(!is_reverse_zone("example.com."));
        assert!(!is_reverse_zone("notin-addr.arpa."));
    }

    #[test]
    fn test_determine_reverse_zone_kind() {
        assert_eq!(
            determine_reverse_zone_kind("2.0.192.in-addr.arpa.").unwrap(),
            AddressKind::Ipv4
        );
        assert_eq!(
            determine_reverse_zone_kind("8.b.d.0.1.0.0.2.ip6.arpa").unwrap(),
            AddressKind::Ipv6
        );
        assert!(matches!(
            determine_reverse_zone_kind("example.com."),
            Err(Error::InvalidZone(_))
        ));
    }

    #[test]
    fn test_reverse_addr_ipv4() {
        assert_eq!(reverse_addr("192.0.2.69").unwrap(), "69.2.0.192.in-addr.arpa.");
    }

    #[test]
    fn test_reverse_addr_ipv6_is_fully_expanded() {
        assert_eq!(
            reverse_addr("2001:db8::1").unwrap(),
            "1.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.8.b.d.0.1.0.0.2.ip6.arpa."
        );
        let ptr = reverse_addr("2001:DB8::ABCD").unwrap();
        assert!(ptr.starts_with("d.c.b.a."));
        assert_eq!(ptr.trim_end_matches("ip6.arpa.").split('.').count() - 1, 32);
    }

    #[test]
    fn test_reverse_addr_invalid() {
        assert!(reverse_addr("256.999.24.2").is_err());
        assert!(reverse_addr("ffff::ffff::ffff").is_err());
    }

    #[test]
    fn test_fits_in_reverse_zone_ipv4() {
        assert!(fits_in_reverse_zone("192.0.2.69", "0.192.in-addr.arpa.").unwrap());
        assert!(!fits_in_reverse_zone("203.0.113.69", "0.192.in-addr.arpa.").unwrap());
        assert!(fits_in_reverse_zone("192.0.2.69", "2.0.192.in-addr.arpa").unwrap());
        assert!(!fits_in_reverse_zone("192.0.3.69", "2.0.192.in-addr.arpa.").unwrap());
        assert!(fits_in_reverse_zone("10.1.2.3", "in-addr.arpa.").unwrap());
        assert!(!fits_in_reverse_zone("192.0.2.69", "1.69.2.0.192.in-addr.arpa.").unwrap());
    }

    #[test]
    fn test_fits_in_reverse_zone_ipv6() {
        assert!(fits_in_reverse_zone("2001:db8::1", "8.b.d.0.1.0.0.2.ip6.arpa.").unwrap());
        assert!(!fits_in_reverse_zone("fe80::1", "8.b.d.0.1.0.0.2.ip6.arpa.").unwrap());
        assert!(fits_in_reverse_zone("2001:db8::1", "8.B.D.0.1.0.0.2.ip6.arpa").unwrap());
    }

    #[test]
    fn test_fits_in_reverse_zone_errors() {
        assert!(matches!(
            fits_in_reverse_zone("256.999.24.2", "0.192.in-addr.arpa."),
            Err(Error::InvalidAddress(_))
        ));
        assert!(matches!(
            fits_in_reverse_zone("192.0.2.1", "example.com."),
            Err(Error::InvalidZone(_))
        ));
        assert!(matches!(
            fits_in_reverse_zone("2001:db8::1", "0.192.in-addr.arpa."),
            Err(Error::InvalidZone(_))
        ));
        assert!(matches!(
            fits_in_reverse_zone("192.0.2.1", "8.b.d.0.1.0.0.2.ip6.arpa."),
            Err(Error::InvalidZone(_))
        ));
    }

    #[test]
    fn test_dns_safe_name() {
        assert_eq!(dns_safe_name("living room tv"), "living-room-tv");
        assert_eq!(dns_safe_name("a \t b"), "a-b");
        assert_eq!(dns_safe_name("plain"), "plain");
    }

    #[test]
    fn test_generated_hostname() {
        assert_eq!(generated_hostname("192.0.2.1"), "ip-192-0-2-1");
        assert_eq!(generated_hostname("2001:db8::1"), "ip-2001-db8--1");
    }

    #[test]
    fn test_ptr_planner_first_claim_wins() {
        let endpoints = vec![
            Endpoint::new("first").with_ipv4("192.0.2.1").with_ttl(60),
            Endpoint::new("second").with_ipv4("192.0.2.1").with_ttl(120),
        ];
        let records = ptr_records_for_endpoints(
            &endpoints,
            Some(AddressKind::Ipv4),
            Some("2.0.192.in-addr.arpa."),
            ".example.com",
        )
        .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].owner, "1.2.0.192.in-addr.arpa.");
        assert_eq!(records[0].target, "first.example.com");
        assert_eq!(records[0].ttl, 60);
    }

    #[test]
    fn test_ptr_planner_skips_addresses_outside_zone() {
        let endpoints = vec![
            Endpoint::new("inside").with_ipv4("192.0.2.1"),
            Endpoint::new("outside").with_ipv4("203.0.113.1"),
        ];
        let records =
            ptr_records_for_endpoints(&endpoints, None, Some("0.192.in-addr.arpa."), "").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].target, "inside");
    }

    #[test]
    fn test_ptr_planner_generates_hostnames() {
        let endpoints = vec![Endpoint::new("").with_ipv4("192.0.2.1").with_ipv6("2001:db8::1")];
        let records = ptr_records_for_endpoints(&endpoints, None, None, ".lan").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].target, "ip-192-0-2-1.lan");
        assert_eq!(records[1].target, "ip-2001-db8--1.lan");
    }

    #[test]
    fn test_ptr_planner_family_filter() {
        let endpoints = vec![Endpoint::new("h").with_ipv4("192.0.2.1").with_ipv6("2001:db8::1")];
        let records =
            ptr_records_for_endpoints(&endpoints, Some(AddressKind::Ipv6), None, "").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].addr, "2001:db8::1");
    }

    #[test]
    fn test_ptr_planner_malformed_address_is_error() {
        let endpoints = vec![Endpoint::new("h").with_ipv4("not-an-ip")];
        assert!(
            ptr_records_for_endpoints(&endpoints, Some(AddressKind::Ipv4), None, "").is_err()
        );
    }
}
