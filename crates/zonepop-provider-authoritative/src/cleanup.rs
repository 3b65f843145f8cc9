//! Paginated zone cleanup
//!
//! Walks a zone page by page and deletes record sets of the given types
//! whose owner name is no longer wanted. A page with nothing to delete ends
//! the walk: cleanup is one best-effort extra pass, not a full sweep.

use tracing::{error, info, warn};
use zonepop_core::Result;
use zonepop_core::rdns::normalize_name;
use zonepop_core::traits::{Change, PageCursor, RecordType, ZoneClient};

/// Delete unwanted record sets from a zone
///
/// `is_wanted` receives normalized owner names (lowercase, trailing dot).
/// Returns the number of record sets deleted.
pub async fn cleanup_zone<C, F>(
    client: &C,
    zone_id: &str,
    record_types: &[RecordType],
    is_wanted: F,
) -> Result<usize>
where
    C: ZoneClient + ?Sized,
    F: Fn(&str) -> bool,
{
    let mut cursor: Option<PageCursor> = None;
    let mut deleted = 0;

    loop {
        let page = client
            .list_record_sets(zone_id, cursor.as_ref())
            .await
            .inspect_err(|e| {
                error!(zone = %zone_id, error = %e, "cleanup: failed to list record sets");
            })?;

        let deletions: Vec<Change> = page
            .record_sets
            .into_iter()
            .filter(|rs| record_types.contains(&rs.record_type))
            .filter(|rs| !is_wanted(&normalize_name(&rs.name)))
            .inspect(|rs| {
                info!(
                    zone = %zone_id,
                    name = %rs.name,
                    record_type = %rs.record_type,
                    "cleanup: removing record"
                );
            })
            .map(Change::delete)
            .collect();

        if deletions.is_empty() {
            info!(zone = %zone_id, "cleanup: no changes needed");
            return Ok(deleted);
        }

        let count = deletions.len();
        client
            .change_record_sets(zone_id, deletions)
            .await
            .inspect_err(|e| {
                error!(zone = %zone_id, error = %e, "cleanup: failed to delete record sets");
            })?;
        deleted += count;

        if !page.is_truncated {
            return Ok(deleted);
        }
        match page.next {
            Some(next) => cursor = Some(next),
            None => {
                warn!(zone = %zone_id, "cleanup: listing truncated without a cursor, stopping");
                return Ok(deleted);
            }
        }
    }
}
