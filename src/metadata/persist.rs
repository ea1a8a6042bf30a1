//! Metadata file persistence
//!
//! The run document lives at a fixed relative location under the content
//! root. It is read once at crawl start and overwritten atomically at
//! crawl end (temp file plus rename), so a crash mid-write never leaves a
//! half-written baseline for the next run.

use crate::metadata::types::CrawlMetadata;
use crate::Result;
use std::fs;
use std::path::Path;

/// Fixed metadata filename under the content root
///
/// Mirrored documents always live under per-host subdirectories, so the
/// name cannot collide with saved content.
pub const METADATA_FILENAME: &str = "crawl-metadata.json";

/// Loads the previous run's metadata, if any
///
/// A missing or malformed file is treated as an empty baseline rather
/// than a fatal error: the next run simply starts without removed-page
/// detection.
pub fn load_metadata(content_root: &Path) -> Option<CrawlMetadata> {
    let path = content_root.join(METADATA_FILENAME);

    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(_) => {
            tracing::debug!("No previous metadata at {}", path.display());
            return None;
        }
    };

    match serde_json::from_str(&content) {
        Ok(metadata) => Some(metadata),
        Err(e) => {
            tracing::warn!(
                "Ignoring malformed metadata file {}: {}",
                path.display(),
                e
            );
            None
        }
    }
}

/// Writes the run metadata atomically under the content root
pub fn save_metadata(content_root: &Path, metadata: &CrawlMetadata) -> Result<()> {
    fs::create_dir_all(content_root)?;

    let path = content_root.join(METADATA_FILENAME);
    let temp_path = content_root.join(format!("{}.tmp", METADATA_FILENAME));

    let serialized = serde_json::to_string_pretty(metadata)?;
    fs::write(&temp_path, serialized)?;
    fs::rename(&temp_path, &path)?;

    tracing::debug!("Wrote metadata to {}", path.display());
    Ok(())
}
