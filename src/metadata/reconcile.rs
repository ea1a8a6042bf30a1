//! Metadata reconciliation
//!
//! Merges this run's per-URL outcomes with the previous run's persisted
//! metadata: derives removed-page entries, computes aggregate statistics
//! from the merged map, and determines the overall run result.

use crate::metadata::types::{
    CrawlMetadata, ItemRecord, ItemStatus, RunResult, StatusReason, UrlResolution,
};
use chrono::Utc;
use std::collections::BTreeMap;

/// Builds the persisted run document from the final item map
///
/// The statistics are a single pass over `items`, incrementing
/// `stats[status]` and `stats["status.reason"]` for every entry. They are
/// never tracked as independent running counters, which eliminates drift
/// between `stats` and `items`. `uniqueUrls` is the total entry count,
/// removed entries included.
///
/// # Arguments
///
/// * `seed_url` - The crawl's seed URL
/// * `scope_prefix` - The primary scope prefix
/// * `items` - The final item map, removed entries already merged in
/// * `url_resolution` - Every observed URL alias and where it resolved
/// * `aborted` - Whether the rate-limit circuit breaker fired
pub fn build_metadata(
    seed_url: &str,
    scope_prefix: &str,
    items: BTreeMap<String, ItemRecord>,
    url_resolution: BTreeMap<String, UrlResolution>,
    aborted: bool,
) -> CrawlMetadata {
    let result = if aborted {
        RunResult::Aborted
    } else if items
        .values()
        .any(|item| item.status == ItemStatus::Failed)
    {
        RunResult::Partial
    } else {
        RunResult::Success
    };

    let mut stats: BTreeMap<String, u64> = BTreeMap::new();
    for item in items.values() {
        *stats.entry(item.status.as_str().to_string()).or_insert(0) += 1;
        let reason_key = format!("{}.{}", item.status.as_str(), item.status_reason.as_str());
        *stats.entry(reason_key).or_insert(0) += 1;
    }
    stats.insert("uniqueUrls".to_string(), items.len() as u64);

    CrawlMetadata {
        seed_url: seed_url.to_string(),
        scope_prefix: scope_prefix.to_string(),
        last_update: Utc::now(),
        result,
        stats,
        items,
        url_resolution,
    }
}

/// Derives removed-page entries from the previous run's items
///
/// For every key in `previous_items` whose status is success and which has
/// no entry in `current_items` (not revisited this run), inserts a
/// `success/removed` record carrying forward the previous `fetched_at`.
/// A key already marked removed in a prior run and still absent is
/// re-inserted as removed again: removal status is sticky across runs
/// until the page reappears. Keys visited this run are left untouched
/// regardless of their previous status.
pub fn mark_removed_items(
    previous_items: &BTreeMap<String, ItemRecord>,
    current_items: &mut BTreeMap<String, ItemRecord>,
) {
    for (key, previous) in previous_items {
        if previous.status != ItemStatus::Success {
            continue;
        }
        if current_items.contains_key(key) {
            continue;
        }

        tracing::info!("Previously mirrored resource disappeared: {}", key);
        current_items.insert(
            key.clone(),
            ItemRecord::new(ItemStatus::Success, StatusReason::Removed, previous.fetched_at),
        );
    }
}
