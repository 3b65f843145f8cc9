// # PowerDNS Zone Client
//
// `ZoneClient` over the PowerDNS Authoritative HTTP API.
//
// ## Behavior
//
// - One HTTP request per trait call, 30 second timeout by default
// - No retries: a failed call is returned and retried by the next pass
// - Listing fetches the zone once per page and pages client side, sorted
//   by (name, type), so the resume cursor is stable across calls
// - Change batches are a single PATCH, applied atomically by the server
//
// ## Security Requirements
//
// - API key NEVER appears in logs or Debug output
// - API key is read from an environment variable by the factory
//
// ## API Reference
//
// - Get zone: GET `/api/v1/servers/:server_id/zones/:zone_id`
// - Patch zone: PATCH `/api/v1/servers/:server_id/zones/:zone_id`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use zonepop_core::config::AuthoritativeConfig;
use zonepop_core::rdns::normalize_name;
use zonepop_core::traits::{
    Change, ChangeAction, PageCursor, RecordPage, RecordSet, RecordType, ZoneClient,
};
use zonepop_core::{Error, Result};

/// Default HTTP timeout for API requests (30 seconds)
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of record sets per listing page
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Zone document, as returned by GET on a zone
#[derive(Debug, Deserialize)]
struct ZoneDocument {
    name: String,
    #[serde(default)]
    rrsets: Vec<RrSet>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RrSet {
    name: String,
    #[serde(rename = "type")]
    record_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ttl: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    changetype: Option<String>,
    #[serde(default)]
    records: Vec<ApiRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiRecord {
    content: String,
    #[serde(default)]
    disabled: bool,
}

#[derive(Debug, Serialize)]
struct PatchDocument {
    rrsets: Vec<RrSet>,
}

impl From<RrSet> for RecordSet {
    fn from(rrset: RrSet) -> Self {
        RecordSet {
            name: rrset.name,
            record_type: RecordType::parse(&rrset.record_type),
            ttl: rrset.ttl.unwrap_or_default(),
            values: rrset.records.into_iter().map(|r| r.content).collect(),
        }
    }
}

// PowerDNS rejects relative names, in rrset names and in PTR contents
impl From<Change> for RrSet {
    fn from(change: Change) -> Self {
        let set = change.record_set;
        let name = normalize_name(&set.name);
        match change.action {
            ChangeAction::Upsert => RrSet {
                name,
                record_type: set.record_type.to_string(),
                ttl: Some(set.ttl),
                changetype: Some("REPLACE".to_string()),
                records: set
                    .values
                    .into_iter()
                    .map(|content| ApiRecord {
                        content: match set.record_type {
                            RecordType::Ptr => normalize_name(&content),
                            _ => content,
                        },
                        disabled: false,
                    })
                    .collect(),
            },
            ChangeAction::Delete => RrSet {
                name,
                record_type: set.record_type.to_string(),
                ttl: None,
                changetype: Some("DELETE".to_string()),
                records: Vec::new(),
            },
        }
    }
}

/// PowerDNS Authoritative API client
pub struct PowerDnsZoneClient {
    /// Base URL, e.g. `http://127.0.0.1:8081`
    api_url: String,

    /// Server id in the API path, usually `localhost`
    server_id: String,

    /// API key sent as `X-API-Key`
    /// ⚠️ NEVER log this value
    api_key: String,

    page_size: usize,

    client: reqwest::Client,
}

// Custom Debug implementation that hides the API key
impl std::fmt::Debug for PowerDnsZoneClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PowerDnsZoneClient")
            .field("api_url", &self.api_url)
            .field("server_id", &self.server_id)
            .field("api_key", &"<REDACTED>")
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl PowerDnsZoneClient {
    /// Create a new client
    ///
    /// # Errors
    ///
    /// - `Error::Config` if the API key is empty or `page_size` is zero
    /// - `Error::Http` if the HTTP client cannot be built
    pub fn new(
        api_url: impl Into<String>,
        server_id: impl Into<String>,
        api_key: impl Into<String>,
        page_size: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(Error::config("PowerDNS API key cannot be empty"));
        }
        if page_size == 0 {
            return Err(Error::config("PowerDNS page size must be > 0"));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            server_id: server_id.into(),
            api_key,
            page_size,
            client,
        })
    }

    /// Create a client from a provider configuration and its API key
    pub fn from_config(config: &AuthoritativeConfig, api_key: impl Into<String>) -> Result<Self> {
        Self::new(
            &config.api_url,
            &config.server_id,
            api_key,
            config.page_size,
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn zone_url(&self, zone_id: &str) -> String {
        format!(
            "{}/api/v1/servers/{}/zones/{}",
            self.api_url, self.server_id, zone_id
        )
    }

    async fn get_zone(&self, zone_id: &str, with_rrsets: bool) -> Result<ZoneDocument> {
        tracing::debug!(zone_id = %zone_id, with_rrsets, "Fetching zone");

        let response = self
            .client
            .get(self.zone_url(zone_id))
            .query(&[("rrsets", with_rrsets)])
            .header("X-API-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| Error::remote_api(format!("HTTP request failed: {e}")))?;

        let response = check_status(response, zone_id, "Zone lookup failed").await?;
        response
            .json()
            .await
            .map_err(|e| Error::remote_api(format!("Failed to parse zone response: {e}")))
    }
}

/// Map a non-success response to `Error::RemoteApi`
async fn check_status(
    response: reqwest::Response,
    zone_id: &str,
    context: &str,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());

    Err(match status.as_u16() {
        401 | 403 => Error::remote_api(format!(
            "Authentication failed: Invalid API key or insufficient permissions. Status: {status}"
        )),
        404 => Error::remote_api(format!("Zone not found: {zone_id}")),
        422 => Error::remote_api(format!("Change rejected by server: {error_text}")),
        429 => Error::remote_api(format!(
            "Rate limit exceeded. Please retry later. Status: {status}"
        )),
        500..=599 => Error::remote_api(format!(
            "PowerDNS server error (transient): {status} - {error_text}"
        )),
        _ => Error::remote_api(format!("{context}: {status} - {error_text}")),
    })
}

/// Serve one page of record sets after `start`
fn paginate(
    mut record_sets: Vec<RecordSet>,
    start: Option<&PageCursor>,
    page_size: usize,
) -> RecordPage {
    let key = |rs: &RecordSet| (rs.name.clone(), rs.record_type.as_str().to_string());
    record_sets.sort_by_key(key);

    let mut remaining: Vec<RecordSet> = match start {
        Some(cursor) => {
            let after = (cursor.name.clone(), cursor.record_type.as_str().to_string());
            record_sets.into_iter().filter(|rs| key(rs) > after).collect()
        }
        None => record_sets,
    };

    let is_truncated = remaining.len() > page_size;
    remaining.truncate(page_size);
    let next = if is_truncated {
        remaining.last().map(|rs| PageCursor {
            name: rs.name.clone(),
            record_type: rs.record_type.clone(),
        })
    } else {
        None
    };

    RecordPage {
        record_sets: remaining,
        is_truncated,
        next,
    }
}

#[async_trait]
impl ZoneClient for PowerDnsZoneClient {
    async fn zone_name(&self, zone_id: &str) -> Result<String> {
        Ok(self.get_zone(zone_id, false).await?.name)
    }

    async fn list_record_sets(
        &self,
        zone_id: &str,
        start: Option<&PageCursor>,
    ) -> Result<RecordPage> {
        let zone = self.get_zone(zone_id, true).await?;
        let record_sets = zone.rrsets.into_iter().map(RecordSet::from).collect();
        Ok(paginate(record_sets, start, self.page_size))
    }

    async fn change_record_sets(&self, zone_id: &str, changes: Vec<Change>) -> Result<()> {
        let document = PatchDocument {
            rrsets: changes.into_iter().map(RrSet::from).collect(),
        };
        tracing::debug!(zone_id = %zone_id, rrsets = document.rrsets.len(), "Patching zone");

        let response = self
            .client
            .patch(self.zone_url(zone_id))
            .header("X-API-Key", &self.api_key)
            .json(&document)
            .send()
            .await
            .map_err(|e| Error::remote_api(format!("HTTP request failed: {e}")))?;

        check_status(response, zone_id, "Zone update failed").await?;
        Ok(())
    }
}
