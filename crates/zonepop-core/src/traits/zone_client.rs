// # Zone Client Trait
//
// The remote side of an authoritative DNS zone: name lookup, paginated
// record listing, and atomic change batches.
//
// ## Implementations
//
// - PowerDNS Authoritative HTTP API: `zonepop-provider-authoritative` crate

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// DNS record type as far as reconciliation cares
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    A,
    Aaaa,
    Ptr,
    /// Any type this system never writes (SOA, NS, TXT...)
    Other(String),
}

impl RecordType {
    /// Wire name of the type (`A`, `AAAA`, `PTR`, ...)
    pub fn as_str(&self) -> &str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Ptr => "PTR",
            RecordType::Other(other) => other,
        }
    }

    /// Parse a wire type name, case-insensitively
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "A" => RecordType::A,
            "AAAA" => RecordType::Aaaa,
            "PTR" => RecordType::Ptr,
            other => RecordType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All records of one type at one owner name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSet {
    /// Owner name, fully qualified
    pub name: String,
    pub record_type: RecordType,
    pub ttl: i64,
    /// Record data (addresses for A/AAAA, target names for PTR)
    pub values: Vec<String>,
}

/// What to do with a record set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    /// Create or replace the whole record set
    Upsert,
    /// Remove the record set
    Delete,
}

/// One entry of a change batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub action: ChangeAction,
    pub record_set: RecordSet,
}

impl Change {
    /// Create an upsert change
    pub fn upsert(record_set: RecordSet) -> Self {
        Self {
            action: ChangeAction::Upsert,
            record_set,
        }
    }

    /// Create a delete change
    pub fn delete(record_set: RecordSet) -> Self {
        Self {
            action: ChangeAction::Delete,
            record_set,
        }
    }
}

/// Resume position for record listing
///
/// Identifies the last record set of the previous page; the next page
/// starts strictly after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    pub name: String,
    pub record_type: RecordType,
}

/// One page of a zone listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPage {
    pub record_sets: Vec<RecordSet>,
    /// Whether more pages follow
    pub is_truncated: bool,
    /// Cursor to pass when requesting the next page
    pub next: Option<PageCursor>,
}

/// Trait for remote authoritative zone APIs
///
/// Implementations perform exactly one remote operation per call, with
/// their own request timeouts. No retries.
#[async_trait]
pub trait ZoneClient: Send + Sync {
    /// Resolve the DNS name of a zone from its identifier
    async fn zone_name(&self, zone_id: &str) -> Result<String, crate::Error>;

    /// List one page of record sets, starting after `start` when given
    async fn list_record_sets(
        &self,
        zone_id: &str,
        start: Option<&PageCursor>,
    ) -> Result<RecordPage, crate::Error>;

    /// Apply a batch of changes atomically
    async fn change_record_sets(
        &self,
        zone_id: &str,
        changes: Vec<Change>,
    ) -> Result<(), crate::Error>;
}

#[async_trait]
impl<T: ZoneClient + ?Sized> ZoneClient for Arc<T> {
    async fn zone_name(&self, zone_id: &str) -> Result<String, crate::Error> {
        (**self).zone_name(zone_id).await
    }

    async fn list_record_sets(
        &self,
        zone_id: &str,
        start: Option<&PageCursor>,
    ) -> Result<RecordPage, crate::Error> {
        (**self).list_record_sets(zone_id, start).await
    }

    async fn change_record_sets(
        &self,
        zone_id: &str,
        changes: Vec<Change>,
    ) -> Result<(), crate::Error> {
        (**self).change_record_sets(zone_id, changes).await
    }
}
