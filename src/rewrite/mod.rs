//! Link rewriting over saved documents
//!
//! After the crawl, absolute links pointing at other locally-saved
//! resources are rewritten into relative filesystem paths, so the mirror
//! browses offline. The pass is fence-aware (fenced code blocks pass
//! through verbatim) and alias-aware: the `urlResolution` map resolves
//! every observed form of a link target, pre-redirect forms included.

use crate::metadata::UrlResolution;
use crate::store;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path};

/// Markdown inline link: `[text](target)` with an optional quoted title
static MARKDOWN_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\[([^\]]*)\]\(([^)\s]+)(\s+"[^"]*")?\)"#).expect("markdown link pattern")
});

/// Result of rewriting one document
#[derive(Debug)]
pub struct RewriteOutcome {
    /// The document with links rewritten
    pub output: String,
    /// Whether at least one link changed
    pub changed: bool,
}

/// Rewrites absolute links in one document to relative local paths
///
/// The document is processed line by line, toggling an inside-fence flag
/// on any line whose trimmed content begins with a fence marker; lines
/// inside a fence pass through verbatim. Outside fences, every markdown
/// link target is inspected:
///
/// - Non-`http(s)` targets are left untouched (already relative)
/// - The fragment-stripped target is looked up in `url_resolution`; a
///   missing mapping, or a mapped file absent on disk, leaves the link
///   untouched
/// - Otherwise the target becomes the relative path from this document's
///   directory to the saved file, with the original fragment and any
///   trailing link title re-appended
///
/// # Arguments
///
/// * `document` - The document text
/// * `from_path` - The document's saved path, relative to the content root
/// * `url_resolution` - Map of any observed URL alias to its resolution
/// * `content_root` - The content root (for existence checks)
pub fn rewrite_links(
    document: &str,
    from_path: &str,
    url_resolution: &BTreeMap<String, UrlResolution>,
    content_root: &Path,
) -> RewriteOutcome {
    let from_dir = Path::new(from_path)
        .parent()
        .unwrap_or_else(|| Path::new(""));

    let mut output_lines: Vec<String> = Vec::with_capacity(document.lines().count());
    let mut inside_fence = false;
    let mut changed = false;

    for line in document.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            inside_fence = !inside_fence;
            output_lines.push(line.to_string());
            continue;
        }

        if inside_fence {
            output_lines.push(line.to_string());
            continue;
        }

        let rewritten = MARKDOWN_LINK.replace_all(line, |captures: &Captures| {
            rewrite_one_link(captures, from_dir, url_resolution, content_root)
        });

        if rewritten != line {
            changed = true;
        }
        output_lines.push(rewritten.into_owned());
    }

    let mut output = output_lines.join("\n");
    if document.ends_with('\n') {
        output.push('\n');
    }

    RewriteOutcome { output, changed }
}

/// Rewrites a single matched link, or reproduces it unchanged
fn rewrite_one_link(
    captures: &Captures,
    from_dir: &Path,
    url_resolution: &BTreeMap<String, UrlResolution>,
    content_root: &Path,
) -> String {
    let whole = captures.get(0).map_or("", |m| m.as_str()).to_string();
    let text = captures.get(1).map_or("", |m| m.as_str());
    let target = captures.get(2).map_or("", |m| m.as_str());
    let title = captures.get(3).map_or("", |m| m.as_str());

    if !target.starts_with("http://") && !target.starts_with("https://") {
        return whole;
    }

    let (stripped, fragment) = match target.split_once('#') {
        Some((stripped, fragment)) => (stripped, Some(fragment)),
        None => (target, None),
    };

    let resolution = match url_resolution.get(stripped) {
        Some(resolution) => resolution,
        None => return whole,
    };

    if !content_root.join(&resolution.saved_path).exists() {
        return whole;
    }

    let mut relative = relative_path(from_dir, Path::new(&resolution.saved_path));
    if let Some(fragment) = fragment {
        relative.push('#');
        relative.push_str(fragment);
    }

    format!("[{}]({}{})", text, relative, title)
}

/// Computes the relative path from one directory to a target file
///
/// Both paths are relative to the same root and contain no `.`/`..`
/// components (saved paths are derived from parsed URLs).
fn relative_path(from_dir: &Path, to: &Path) -> String {
    let from_components: Vec<&str> = from_dir
        .components()
        .filter_map(component_str)
        .collect();
    let to_components: Vec<&str> = to.components().filter_map(component_str).collect();

    let common = from_components
        .iter()
        .zip(to_components.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = Vec::new();
    for _ in common..from_components.len() {
        parts.push("..");
    }
    parts.extend(&to_components[common..]);

    parts.join("/")
}

fn component_str(component: Component) -> Option<&str> {
    match component {
        Component::Normal(part) => part.to_str(),
        _ => None,
    }
}

/// Rewrites every saved document under the content root
///
/// A document is rewritten on disk only if at least one of its links
/// changed. Returns the number of rewritten documents.
pub fn rewrite_all(
    content_root: &Path,
    url_resolution: &BTreeMap<String, UrlResolution>,
) -> crate::Result<usize> {
    let mut rewritten = 0;

    for document_path in store::list_documents(content_root)? {
        let relative = match document_path.strip_prefix(content_root) {
            Ok(relative) => relative.to_string_lossy().into_owned(),
            Err(_) => continue,
        };

        let content = match fs::read_to_string(&document_path) {
            Ok(content) => content,
            // Binary leftovers in the mirror tree are not rewritable
            Err(_) => continue,
        };

        let outcome = rewrite_links(&content, &relative, url_resolution, content_root);
        if outcome.changed {
            fs::write(&document_path, outcome.output)?;
            rewritten += 1;
            tracing::debug!("Rewrote links in {}", relative);
        }
    }

    tracing::info!("Link rewriting touched {} documents", rewritten);
    Ok(rewritten)
}
