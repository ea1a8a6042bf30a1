//! Candidate link extraction from fetched document bodies
//!
//! Documentation sites serve a mix of markdown, HTML, and plain text, so
//! extraction is pattern-based rather than DOM-based. Four patterns are
//! applied independently and unioned before resolution:
//!
//! 1. Markdown inline links `[text](target)`
//! 2. Markdown reference-style definitions `[label]: target`
//! 3. HTML `href="target"` / `href='target'` attributes
//! 4. Bare `https://` tokens

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use url::Url;

/// Markdown inline link target: `[text](target)` or `[text](target "title")`
static INLINE_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\]]*\]\(\s*([^)\s]+)").expect("inline link pattern"));

/// Markdown reference-style definition: `[label]: target` at line start
static REFERENCE_DEF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*\[[^\]]+\]:\s+(\S+)").expect("reference def pattern"));

/// HTML href attribute, case-insensitive, single or double quoted
static HREF_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)href\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("href pattern")
});

/// Bare https:// token, terminated at whitespace or a delimiter
static BARE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https://[^\s<>"')\]]+"#).expect("bare url pattern"));

/// A captured string containing `://` must carry a syntactically valid
/// scheme, otherwise the URL resolver would silently treat it as a
/// relative path.
static VALID_SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://").expect("scheme pattern"));

/// Extracts candidate link targets from a document body
///
/// The four extraction patterns are applied independently and their raw
/// captures unioned. Each capture is resolved against `base_url` (relative
/// references become absolute), the fragment is stripped, and the result is
/// kept only if it starts with at least one configured scope prefix.
/// Malformed targets are silently discarded; extraction never fails.
///
/// The returned sequence is deduplicated on the fragment-stripped,
/// scope-filtered normalized form; its order is not meaningful.
///
/// # Arguments
///
/// * `body` - The document body to scan
/// * `base_url` - The base URL for resolving relative references
/// * `scope_prefixes` - The configured scope prefixes
pub fn extract_urls(body: &str, base_url: &Url, scope_prefixes: &[String]) -> Vec<String> {
    let mut raw_targets: Vec<&str> = Vec::new();

    for capture in INLINE_LINK.captures_iter(body) {
        if let Some(target) = capture.get(1) {
            raw_targets.push(target.as_str());
        }
    }

    for capture in REFERENCE_DEF.captures_iter(body) {
        if let Some(target) = capture.get(1) {
            raw_targets.push(target.as_str());
        }
    }

    for capture in HREF_ATTR.captures_iter(body) {
        if let Some(target) = capture.get(1).or_else(|| capture.get(2)) {
            raw_targets.push(target.as_str());
        }
    }

    for token in BARE_URL.find_iter(body) {
        raw_targets.push(token.as_str());
    }

    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for raw in raw_targets {
        if let Some(normalized) = resolve_target(raw, base_url) {
            if !in_scope_of(&normalized, scope_prefixes) {
                continue;
            }
            if seen.insert(normalized.clone()) {
                urls.push(normalized);
            }
        }
    }

    urls
}

/// Resolves a raw captured target against the base URL and strips the
/// fragment, returning None for anything malformed
fn resolve_target(raw: &str, base_url: &Url) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    // A target containing :// without a valid scheme prefix would be
    // resolved as a relative path; reject it before resolution.
    if raw.contains("://") && !VALID_SCHEME.is_match(raw) {
        return None;
    }

    let mut resolved = base_url.join(raw).ok()?;
    resolved.set_fragment(None);
    Some(resolved.to_string())
}

fn in_scope_of(url: &str, scope_prefixes: &[String]) -> bool {
    scope_prefixes.iter().any(|prefix| url.starts_with(prefix))
}
