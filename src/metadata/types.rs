//! Provenance record definitions for mirrored resources
//!
//! Every visited or skipped resource gets exactly one record per run,
//! keyed by its local relative path when it was saved, or by its full URL
//! when it never resolved to a local path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Coarse outcome classification for one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// Fetched and saved (or carried forward as removed)
    Success,
    /// Deliberately not stored this run
    Skipped,
    /// Exhausted its retry budget
    Failed,
}

/// Fine-grained reason within an item's status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatusReason {
    // ===== success reasons =====
    /// First time this path was written
    New,
    /// Content differed from the prior file
    Changed,
    /// Content identical to the prior file; no write happened
    Unchanged,
    /// Previously mirrored, not seen this run; flagged, not deleted
    Removed,

    // ===== skipped reasons =====
    /// Dequeued URL no longer inside any scope prefix
    OutOfScope,
    /// A different URL already produced the same saved path this run
    Duplicate,
    /// A redirect hop left the configured scope
    RedirectOutOfScope,
    /// A redirect landed on an already-fetched resource
    RedirectDuplicate,

    // ===== failed reasons =====
    /// Terminal HTTP or transport failure
    HttpError,
}

impl ItemStatus {
    /// Stable string form used for statistics keys
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

impl StatusReason {
    /// Stable string form used for statistics keys
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Changed => "changed",
            Self::Unchanged => "unchanged",
            Self::Removed => "removed",
            Self::OutOfScope => "outOfScope",
            Self::Duplicate => "duplicate",
            Self::RedirectOutOfScope => "redirectOutOfScope",
            Self::RedirectDuplicate => "redirectDuplicate",
            Self::HttpError => "httpError",
        }
    }

    /// Returns whether this reason belongs to the given status's
    /// enumerated set
    pub fn valid_for(&self, status: ItemStatus) -> bool {
        match status {
            ItemStatus::Success => matches!(
                self,
                Self::New | Self::Changed | Self::Unchanged | Self::Removed
            ),
            ItemStatus::Skipped => matches!(
                self,
                Self::OutOfScope
                    | Self::Duplicate
                    | Self::RedirectOutOfScope
                    | Self::RedirectDuplicate
            ),
            ItemStatus::Failed => matches!(self, Self::HttpError),
        }
    }
}

/// One resource's provenance for the current run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
    pub status: ItemStatus,
    pub status_reason: StatusReason,
    /// Timestamp of the outcome that produced this record
    pub fetched_at: DateTime<Utc>,
}

impl ItemRecord {
    /// Creates a record, enforcing that the reason belongs to the status
    pub fn new(status: ItemStatus, status_reason: StatusReason, fetched_at: DateTime<Utc>) -> Self {
        debug_assert!(
            status_reason.valid_for(status),
            "status reason {:?} does not belong to status {:?}",
            status_reason,
            status
        );
        Self {
            status,
            status_reason,
            fetched_at,
        }
    }
}

/// Where an observed URL variant ended up
///
/// Any alias of a resource observed during the crawl (pre-redirect forms
/// included) maps to its final URL and saved path, so the link rewriter
/// can resolve every equivalent form of a link target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlResolution {
    pub final_url: String,
    pub saved_path: String,
}

/// Overall run classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunResult {
    /// Every item succeeded or was deliberately skipped
    Success,
    /// At least one item failed, but the run completed
    Partial,
    /// The rate-limit circuit breaker stopped the run
    Aborted,
}

/// The persisted run document, written once per run and read back as the
/// baseline for the next run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlMetadata {
    pub seed_url: String,
    pub scope_prefix: String,
    pub last_update: DateTime<Utc>,
    pub result: RunResult,
    /// Derived counters; never incremented independently of `items`
    pub stats: BTreeMap<String, u64>,
    pub items: BTreeMap<String, ItemRecord>,
    pub url_resolution: BTreeMap<String, UrlResolution>,
}
