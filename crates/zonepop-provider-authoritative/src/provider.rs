//! Forward and reverse zone synchronization
//!
//! One [`AuthoritativeProvider`] manages up to three zones on one remote API:
//! a forward zone receiving A/AAAA records and an IPv4 and an IPv6 reverse
//! zone receiving PTR records. Each update runs the forward phase, then the
//! IPv4 reverse phase, then the IPv6 reverse phase. The first failing phase
//! aborts the update; phases already written are left in place.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

use zonepop_core::config::{AuthoritativeConfig, ZoneSettings};
use zonepop_core::rdns::{
    AddressKind, determine_reverse_zone_kind, dns_safe_name, normalize_name,
    ptr_records_for_endpoints, reverse_addr,
};
use zonepop_core::traits::{Change, RecordSet, RecordType, ZoneClient};
use zonepop_core::{Endpoint, Error, Provider, ProviderFilters, Result};

use crate::cleanup::cleanup_zone;

/// A configured zone and its lazily resolved DNS name
#[derive(Debug)]
struct ZoneTarget {
    id: String,
    name: OnceCell<String>,
    cleanup: bool,
}

impl ZoneTarget {
    fn new(settings: &ZoneSettings) -> Self {
        Self {
            id: settings.id.clone(),
            name: OnceCell::new_with(settings.name.as_deref().map(normalize_name)),
            cleanup: settings.cleanup,
        }
    }

    /// Zone name, asked from the remote API on first use only
    async fn name<C: ZoneClient + ?Sized>(&self, client: &C) -> Result<&str> {
        let name = self
            .name
            .get_or_try_init(|| async {
                let name = client.zone_name(&self.id).await.inspect_err(|e| {
                    error!(zone_id = %self.id, error = %e, "Failed to resolve zone name");
                })?;
                let name = normalize_name(&name);
                info!(zone_id = %self.id, zone = %name, "Resolved zone name");
                Ok::<_, Error>(name)
            })
            .await?;
        Ok(name.as_str())
    }
}

/// Endpoints sharing one hostname, in first-seen order
struct HostGroup<'a> {
    hostname: &'a str,
    endpoints: Vec<&'a Endpoint>,
}

/// Provider converging authoritative zones to the endpoint set
#[derive(Debug)]
pub struct AuthoritativeProvider<C> {
    name: String,
    client: C,
    forward_zone: Option<ZoneTarget>,
    ipv4_reverse_zone: Option<ZoneTarget>,
    ipv6_reverse_zone: Option<ZoneTarget>,
    record_suffix: Option<String>,
    filters: ProviderFilters,
}

impl<C: ZoneClient> AuthoritativeProvider<C> {
    /// Create a provider managing no zones yet
    pub fn new(name: impl Into<String>, client: C) -> Self {
        Self {
            name: name.into(),
            client,
            forward_zone: None,
            ipv4_reverse_zone: None,
            ipv6_reverse_zone: None,
            record_suffix: None,
            filters: ProviderFilters::default(),
        }
    }

    /// Create a provider from its configuration section
    pub fn from_config(
        name: impl Into<String>,
        client: C,
        config: &AuthoritativeConfig,
        filters: ProviderFilters,
    ) -> Self {
        Self {
            name: name.into(),
            client,
            forward_zone: config.forward_zone.as_ref().map(ZoneTarget::new),
            ipv4_reverse_zone: config.ipv4_reverse_zone.as_ref().map(ZoneTarget::new),
            ipv6_reverse_zone: config.ipv6_reverse_zone.as_ref().map(ZoneTarget::new),
            record_suffix: config.record_suffix.clone(),
            filters,
        }
    }

    pub fn with_forward_zone(mut self, zone: &ZoneSettings) -> Self {
        self.forward_zone = Some(ZoneTarget::new(zone));
        self
    }

    pub fn with_ipv4_reverse_zone(mut self, zone: &ZoneSettings) -> Self {
        self.ipv4_reverse_zone = Some(ZoneTarget::new(zone));
        self
    }

    pub fn with_ipv6_reverse_zone(mut self, zone: &ZoneSettings) -> Self {
        self.ipv6_reverse_zone = Some(ZoneTarget::new(zone));
        self
    }

    /// Suffix appended to hostnames; defaults to `"." + forward zone name`
    pub fn with_record_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.record_suffix = Some(suffix.into());
        self
    }

    pub fn with_filters(mut self, filters: ProviderFilters) -> Self {
        self.filters = filters;
        self
    }

    /// Suffix for full hostnames
    ///
    /// The configured suffix wins. Otherwise the forward zone name is used,
    /// which may cost one remote lookup; with neither, hostnames are used as
    /// they are.
    async fn record_suffix(&self) -> Result<String> {
        if let Some(suffix) = &self.record_suffix {
            return Ok(suffix.clone());
        }
        match &self.forward_zone {
            Some(zone) => Ok(format!(".{}", zone.name(&self.client).await?)),
            None => Ok(String::new()),
        }
    }

    async fn sync_forward(&self, endpoints: &[&Endpoint]) -> Result<()> {
        let Some(zone) = &self.forward_zone else {
            info!(provider = %self.name, "Forward zone not configured, skipping");
            return Ok(());
        };
        let zone_name = zone.name(&self.client).await?;
        let suffix = self.record_suffix().await?;
        let groups = group_by_hostname(endpoints);

        if zone.cleanup {
            let wanted: HashSet<String> = groups
                .iter()
                .map(|group| normalize_name(&full_hostname(group.hostname, &suffix)))
                .collect();
            cleanup_zone(
                &self.client,
                &zone.id,
                &[RecordType::A, RecordType::Aaaa],
                |name| wanted.contains(name),
            )
            .await?;
        }

        let changes = forward_changes(&groups, &suffix);
        self.submit(zone, zone_name, changes).await
    }

    async fn sync_reverse(&self, kind: AddressKind, endpoints: &[&Endpoint]) -> Result<()> {
        let zone = match kind {
            AddressKind::Ipv4 => &self.ipv4_reverse_zone,
            AddressKind::Ipv6 => &self.ipv6_reverse_zone,
        };
        let Some(zone) = zone else {
            info!(provider = %self.name, "{kind} reverse zone not configured, skipping");
            return Ok(());
        };
        let zone_name = zone.name(&self.client).await?;
        if determine_reverse_zone_kind(zone_name)? != kind {
            return Err(Error::invalid_zone(format!(
                "zone {zone_name} is not an {kind} reverse zone"
            )));
        }
        let suffix = self.record_suffix().await?;
        let records =
            ptr_records_for_endpoints(endpoints.iter().copied(), Some(kind), Some(zone_name), &suffix)?;

        if zone.cleanup {
            let wanted = endpoints
                .iter()
                .flat_map(|endpoint| kind.addresses(endpoint))
                .map(|addr| reverse_addr(addr).map(|ptr| normalize_name(&ptr)))
                .collect::<Result<HashSet<String>>>()?;
            cleanup_zone(&self.client, &zone.id, &[RecordType::Ptr], |name| {
                wanted.contains(name)
            })
            .await?;
        }

        let changes = records
            .into_iter()
            .map(|record| {
                debug!(
                    ptr = %record.owner,
                    full_hostname = %record.target,
                    ttl = record.ttl,
                    "Adding PTR record"
                );
                Change::upsert(RecordSet {
                    name: record.owner,
                    record_type: RecordType::Ptr,
                    ttl: record.ttl,
                    values: vec![record.target],
                })
            })
            .collect();
        self.submit(zone, zone_name, changes).await
    }

    /// Send one change batch, never an empty one
    async fn submit(&self, zone: &ZoneTarget, zone_name: &str, changes: Vec<Change>) -> Result<()> {
        if changes.is_empty() {
            info!(provider = %self.name, zone = %zone_name, "No changes to submit");
            return Ok(());
        }
        let count = changes.len();
        self.client
            .change_record_sets(&zone.id, changes)
            .await
            .inspect_err(|e| {
                error!(provider = %self.name, zone = %zone_name, error = %e, "Failed to submit changes");
            })?;
        info!(provider = %self.name, zone = %zone_name, changes = count, "Submitted changes");
        Ok(())
    }
}

#[async_trait]
impl<C: ZoneClient> Provider for AuthoritativeProvider<C> {
    async fn update_endpoints(&self, endpoints: &[Endpoint]) -> Result<()> {
        let forward = self.filters.forward.apply(endpoints);
        let reverse = self.filters.reverse.apply(endpoints);

        self.sync_forward(&forward).await?;
        self.sync_reverse(AddressKind::Ipv4, &reverse).await?;
        self.sync_reverse(AddressKind::Ipv6, &reverse).await?;
        Ok(())
    }
}

fn full_hostname(hostname: &str, suffix: &str) -> String {
    dns_safe_name(hostname) + suffix
}

fn group_by_hostname<'a>(endpoints: &[&'a Endpoint]) -> Vec<HostGroup<'a>> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<HostGroup<'a>> = Vec::new();

    for &endpoint in endpoints {
        if endpoint.hostname.is_empty() {
            debug!("Skipping endpoint without hostname for forward zone");
            continue;
        }
        match index.get(endpoint.hostname.as_str()) {
            Some(&i) => groups[i].endpoints.push(endpoint),
            None => {
                index.insert(endpoint.hostname.as_str(), groups.len());
                groups.push(HostGroup {
                    hostname: &endpoint.hostname,
                    endpoints: vec![endpoint],
                });
            }
        }
    }
    groups
}

fn forward_changes(groups: &[HostGroup<'_>], suffix: &str) -> Vec<Change> {
    let mut changes = Vec::new();

    for group in groups {
        let name = full_hostname(group.hostname, suffix);
        // Groups are never empty; endpoints of one hostname share a TTL
        let ttl = group.endpoints.first().map_or(0, |e| e.record_ttl);
        let ipv4s = unique(group.endpoints.iter().flat_map(|e| &e.ipv4s));
        let ipv6s = unique(group.endpoints.iter().flat_map(|e| &e.ipv6s));

        for (record_type, values) in [(RecordType::A, ipv4s), (RecordType::Aaaa, ipv6s)] {
            if values.is_empty() {
                continue;
            }
            debug!(
                full_hostname = %name,
                record_type = %record_type,
                addrs = ?values,
                ttl,
                "Adding forward record"
            );
            changes.push(Change::upsert(RecordSet {
                name: name.clone(),
                record_type,
                ttl,
                values,
            }));
        }
    }
    changes
}

fn unique<'a>(addrs: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    let mut seen: HashSet<&'a str> = HashSet::new();
    let mut values = Vec::new();
    for addr in addrs {
        if seen.insert(addr.as_str()) {
            values.push(addr.clone());
        }
    }
    values
}
