//! Shared test doubles for authoritative provider tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use zonepop_core::config::ZoneSettings;
use zonepop_core::traits::{
    Change, ChangeAction, PageCursor, RecordPage, RecordSet, RecordType, ZoneClient,
};
use zonepop_core::{Endpoint, Error, Result};

pub const FORWARD_ZONE: &str = "Z-FORWARD";
pub const IPV4_ZONE: &str = "Z-IPV4";
pub const IPV6_ZONE: &str = "Z-IPV6";

type RecordKey = (String, String);

#[derive(Default)]
struct MockZone {
    name: String,
    records: BTreeMap<RecordKey, RecordSet>,
}

/// In-memory zone API with call recording
pub struct MockZoneClient {
    zones: Mutex<HashMap<String, MockZone>>,
    page_size: usize,
    zone_name_calls: AtomicUsize,
    list_calls: AtomicUsize,
    batches: Mutex<Vec<(String, Vec<Change>)>>,
    change_failure: Mutex<Option<String>>,
}

impl MockZoneClient {
    /// Client hosting `example.org.`, `2.0.192.in-addr.arpa.` and
    /// `8.b.d.0.1.0.0.2.ip6.arpa.`
    pub fn new() -> Self {
        Self::empty()
            .with_zone(FORWARD_ZONE, "example.org.")
            .with_zone(IPV4_ZONE, "2.0.192.in-addr.arpa.")
            .with_zone(IPV6_ZONE, "8.b.d.0.1.0.0.2.ip6.arpa.")
    }

    pub fn empty() -> Self {
        Self {
            zones: Mutex::new(HashMap::new()),
            page_size: 100,
            zone_name_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            batches: Mutex::new(Vec::new()),
            change_failure: Mutex::new(None),
        }
    }

    pub fn with_zone(self, id: &str, name: &str) -> Self {
        self.zones.lock().unwrap().insert(
            id.to_string(),
            MockZone {
                name: name.to_string(),
                records: BTreeMap::new(),
            },
        );
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Put a record set into a zone without recording a batch
    pub fn seed(&self, zone_id: &str, name: &str, record_type: RecordType, values: &[&str]) {
        let set = RecordSet {
            name: name.to_string(),
            record_type,
            ttl: 300,
            values: values.iter().map(|v| v.to_string()).collect(),
        };
        let mut zones = self.zones.lock().unwrap();
        let zone = zones.get_mut(zone_id).expect("zone exists");
        zone.records.insert(key_of(&set), set);
    }

    /// Make every following change batch fail
    pub fn fail_changes(&self, message: &str) {
        *self.change_failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn records(&self, zone_id: &str) -> Vec<RecordSet> {
        let zones = self.zones.lock().unwrap();
        zones
            .get(zone_id)
            .map(|zone| zone.records.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn record_names(&self, zone_id: &str, record_type: RecordType) -> Vec<String> {
        self.records(zone_id)
            .into_iter()
            .filter(|rs| rs.record_type == record_type)
            .map(|rs| rs.name)
            .collect()
    }

    pub fn batches(&self) -> Vec<(String, Vec<Change>)> {
        self.batches.lock().unwrap().clone()
    }

    pub fn batches_for(&self, zone_id: &str) -> Vec<Vec<Change>> {
        self.batches()
            .into_iter()
            .filter(|(id, _)| id == zone_id)
            .map(|(_, changes)| changes)
            .collect()
    }

    pub fn zone_name_calls(&self) -> usize {
        self.zone_name_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

fn key_of(set: &RecordSet) -> RecordKey {
    (
        set.name.to_ascii_lowercase(),
        set.record_type.as_str().to_string(),
    )
}

#[async_trait]
impl ZoneClient for MockZoneClient {
    async fn zone_name(&self, zone_id: &str) -> Result<String> {
        self.zone_name_calls.fetch_add(1, Ordering::SeqCst);
        let zones = self.zones.lock().unwrap();
        zones
            .get(zone_id)
            .map(|zone| zone.name.clone())
            .ok_or_else(|| Error::remote_api(format!("Zone not found: {zone_id}")))
    }

    async fn list_record_sets(
        &self,
        zone_id: &str,
        start: Option<&PageCursor>,
    ) -> Result<RecordPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let zones = self.zones.lock().unwrap();
        let zone = zones
            .get(zone_id)
            .ok_or_else(|| Error::remote_api(format!("Zone not found: {zone_id}")))?;

        let after = start.map(|c| (c.name.to_ascii_lowercase(), c.record_type.as_str().to_string()));
        let mut remaining: Vec<RecordSet> = zone
            .records
            .iter()
            .filter(|(key, _)| after.as_ref().is_none_or(|after| *key > after))
            .map(|(_, set)| set.clone())
            .collect();

        let is_truncated = remaining.len() > self.page_size;
        remaining.truncate(self.page_size);
        let next = is_truncated.then(|| {
            let last = remaining.last().expect("truncated page is not empty");
            PageCursor {
                name: last.name.clone(),
                record_type: last.record_type.clone(),
            }
        });
        Ok(RecordPage {
            record_sets: remaining,
            is_truncated,
            next,
        })
    }

    async fn change_record_sets(&self, zone_id: &str, changes: Vec<Change>) -> Result<()> {
        if let Some(message) = self.change_failure.lock().unwrap().clone() {
            return Err(Error::remote_api(message));
        }
        assert!(!changes.is_empty(), "empty change batch submitted");
        self.batches
            .lock()
            .unwrap()
            .push((zone_id.to_string(), changes.clone()));

        let mut zones = self.zones.lock().unwrap();
        let zone = zones
            .get_mut(zone_id)
            .ok_or_else(|| Error::remote_api(format!("Zone not found: {zone_id}")))?;
        for change in changes {
            let key = key_of(&change.record_set);
            match change.action {
                ChangeAction::Upsert => {
                    zone.records.insert(key, change.record_set);
                }
                ChangeAction::Delete => {
                    zone.records.remove(&key);
                }
            }
        }
        Ok(())
    }
}

pub fn zone(id: &str) -> ZoneSettings {
    ZoneSettings {
        id: id.to_string(),
        name: None,
        cleanup: false,
    }
}

pub fn zone_with_cleanup(id: &str) -> ZoneSettings {
    ZoneSettings {
        cleanup: true,
        ..zone(id)
    }
}

pub fn host(hostname: &str, ipv4: &str) -> Endpoint {
    Endpoint::new(hostname).with_ipv4(ipv4).with_ttl(300)
}

/// Values of every upsert in a batch, keyed by (name, type)
pub fn upserts(batch: &[Change]) -> Vec<(String, String, Vec<String>)> {
    batch
        .iter()
        .filter(|c| c.action == ChangeAction::Upsert)
        .map(|c| {
            (
                c.record_set.name.clone(),
                c.record_set.record_type.to_string(),
                c.record_set.values.clone(),
            )
        })
        .collect()
}
