use crate::UrlError;
use url::Url;

/// Normalizes a URL according to Kagami-Mirror's normalization rules
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Validate the scheme (only HTTP and HTTPS are crawlable)
/// 3. Remove the fragment (everything after #)
///
/// Two links differing only by fragment point at the same HTTP resource, so
/// the fragment-stripped form is the identity used by the queue, the
/// visited sets, and the metadata keys.
///
/// # Arguments
///
/// * `url_str` - The URL string to normalize
///
/// # Returns
///
/// * `Ok(Url)` - Normalized URL
/// * `Err(UrlError)` - Failed to parse or normalize the URL
///
/// # Examples
///
/// ```
/// use kagami_mirror::url::normalize_url;
///
/// let url = normalize_url("https://docs.example.com/guide#intro").unwrap();
/// assert_eq!(url.as_str(), "https://docs.example.com/guide");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    url.set_fragment(None);

    Ok(url)
}

/// Checks whether a URL falls inside the configured crawl scope
///
/// A URL is in scope iff it starts with at least one configured scope
/// prefix. Multiple prefixes support cross-domain allow-lists, e.g. a
/// primary documentation site plus an auxiliary source repository.
///
/// # Arguments
///
/// * `url` - The URL string to check (expected in normalized form)
/// * `scope_prefixes` - The configured scope prefixes
///
/// # Examples
///
/// ```
/// use kagami_mirror::url::in_scope;
///
/// let prefixes = vec!["https://docs.example.com/".to_string()];
/// assert!(in_scope("https://docs.example.com/guide", &prefixes));
/// assert!(!in_scope("https://other.example.com/", &prefixes));
/// ```
pub fn in_scope(url: &str, scope_prefixes: &[String]) -> bool {
    scope_prefixes.iter().any(|prefix| url.starts_with(prefix))
}
