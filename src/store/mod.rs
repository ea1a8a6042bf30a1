//! Content store: persists fetched bodies under deterministic paths
//!
//! A resource's saved path is derived from its URL's host and path
//! segments, joined under the content root. Writes are idempotent:
//! existing files are compared byte-for-byte against the new body, and
//! identical content produces no disk I/O beyond the read-for-comparison.

use crate::{MirrorError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// Conventional index filename appended when a URL's path ends in `/` or
/// its final segment carries no file extension
pub const INDEX_FILENAME: &str = "index.md";

/// How a save changed the local mirror
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// No prior file existed at the derived path
    New,
    /// A prior file existed with different content and was overwritten
    Changed,
    /// A prior file existed with identical content; nothing was written
    Unchanged,
}

/// Derives the local relative path for a URL
///
/// The path is the URL's host followed by its path segments, with
/// `index.md` appended for directory-like URLs. The returned string uses
/// `/` separators and doubles as the resource's metadata key.
///
/// Returns None for URLs without a host.
///
/// # Examples
///
/// ```
/// use kagami_mirror::store::saved_path_for;
///
/// assert_eq!(
///     saved_path_for("https://docs.example.com/guide/setup.md").unwrap(),
///     "docs.example.com/guide/setup.md"
/// );
/// assert_eq!(
///     saved_path_for("https://docs.example.com/guide/").unwrap(),
///     "docs.example.com/guide/index.md"
/// );
/// ```
pub fn saved_path_for(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;

    // Non-default ports keep mirrors of distinct origins apart
    let root = match parsed.port() {
        Some(port) => format!("{}-{}", host, port),
        None => host.to_string(),
    };

    let mut segments: Vec<String> = Vec::new();
    if let Some(path_segments) = parsed.path_segments() {
        for segment in path_segments {
            if !segment.is_empty() {
                segments.push(segment.to_string());
            }
        }
    }

    let directory_like = parsed.path().ends_with('/')
        || segments
            .last()
            .map_or(true, |segment| !segment.contains('.'));
    if directory_like {
        segments.push(INDEX_FILENAME.to_string());
    }

    Some(format!("{}/{}", root, segments.join("/")))
}

/// Persists a fetched body under its derived path
///
/// If a file already exists at the derived path, its content is compared
/// byte-for-byte against the new body: identical content returns
/// `Unchanged` and performs no write. Differing content triggers an
/// overwrite. Absence triggers a create with recursive parent creation.
///
/// # Arguments
///
/// * `url` - The URL the body was fetched from
/// * `body` - The fetched body
/// * `content_root` - The validated content root directory
pub fn save(url: &str, body: &str, content_root: &Path) -> Result<SaveOutcome> {
    let relative = saved_path_for(url).ok_or_else(|| MirrorError::Store {
        path: url.to_string(),
        message: "URL has no host to derive a path from".to_string(),
    })?;

    let full_path = content_root.join(&relative);

    if full_path.exists() {
        let existing = fs::read(&full_path)?;
        if existing == body.as_bytes() {
            tracing::debug!("Unchanged: {}", relative);
            return Ok(SaveOutcome::Unchanged);
        }

        fs::write(&full_path, body)?;
        tracing::debug!("Changed: {}", relative);
        return Ok(SaveOutcome::Changed);
    }

    if let Some(parent) = full_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&full_path, body)?;
    tracing::debug!("New: {}", relative);
    Ok(SaveOutcome::New)
}

/// Lists every saved document under the content root, recursively
///
/// The metadata file (and its temp sibling) at the root is not a
/// document and is excluded.
pub fn list_documents(content_root: &Path) -> Result<Vec<PathBuf>> {
    let mut documents = Vec::new();
    if content_root.is_dir() {
        collect_documents(content_root, content_root, &mut documents)?;
    }
    documents.sort();
    Ok(documents)
}

fn collect_documents(root: &Path, dir: &Path, documents: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_documents(root, &path, documents)?;
        } else if path.parent() != Some(root) {
            // Files directly at the root are bookkeeping, not mirrored
            // content; documents always live under a host directory.
            documents.push(path);
        }
    }
    Ok(())
}
