//! Run metadata: the only state that outlives a single crawl
//!
//! This module defines the per-URL provenance records and the persisted
//! run document, reconciles the current run against the previous run's
//! state, and reads/writes the JSON metadata file under the content root.

mod persist;
mod reconcile;
mod types;

// Re-export main types and operations
pub use persist::{load_metadata, save_metadata, METADATA_FILENAME};
pub use reconcile::{build_metadata, mark_removed_items};
pub use types::{CrawlMetadata, ItemRecord, ItemStatus, RunResult, StatusReason, UrlResolution};
