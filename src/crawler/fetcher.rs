//! HTTP fetcher implementation
//!
//! This module performs one logical fetch per call, including:
//! - Building HTTP clients with proper user agent strings
//! - Manual redirect following with a bounded hop budget
//! - Scope checking of redirect targets
//! - Rate-limit (HTTP 429) detection with Retry-After parsing
//! - Content-type gating before the body is read
//!
//! No retries happen here; retry/backoff policy belongs to the crawl loop.

use crate::config::UserAgentConfig;
use crate::url::in_scope;
use reqwest::header::{CONTENT_TYPE, LOCATION, RETRY_AFTER};
use reqwest::{redirect::Policy, Client, StatusCode};
use std::time::Duration;
use url::Url;

/// Result of one logical fetch, after following in-scope redirects
#[derive(Debug)]
pub enum FetchOutcome {
    /// Terminal 2xx with a recognized text content-type
    Success {
        /// Final URL after redirects
        final_url: String,
        /// Page body content
        body: String,
        /// Content-Type header value
        content_type: String,
    },

    /// A redirect hop left the configured scope
    OutOfScope {
        /// The URL the fetch started from
        original_url: String,
        /// The resolved redirect target that fell out of scope
        redirected_to: String,
    },

    /// HTTP 429
    RateLimited {
        /// Retry-After header in milliseconds, when present and numeric
        retry_after_ms: Option<u64>,
    },

    /// Network failure, missing Location header, non-2xx status, or
    /// redirect-limit exceeded
    Error {
        /// Error description, when the failure was not a bare status code
        reason: Option<String>,
        /// HTTP status code, when one was received
        status: Option<u16>,
    },

    /// 2xx whose content-type is not a recognized text family; the body is
    /// never read for these
    NonText {
        /// The actual Content-Type received
        content_type: String,
        /// The URL that served it
        url: String,
    },
}

/// Builds an HTTP client with proper configuration
///
/// Redirect following is disabled; the fetcher follows redirects manually
/// so that every hop can be scope-checked.
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout_secs` - Whole-request timeout in seconds
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout_secs: u64,
) -> Result<Client, reqwest::Error> {
    // Format: Name/Version (+ContactURL)
    let user_agent = format!(
        "{}/{} (+{})",
        config.name, config.version, config.contact_url
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL, manually following same-scope redirects
///
/// # Request Flow
///
/// 1. GET the current URL with automatic redirects disabled
/// 2. On 3xx: resolve the Location header against the current URL
///    - Missing Location → `Error`
///    - Resolved target outside every scope prefix → `OutOfScope`
///      (redirect chains are not scope-checked past the first
///      out-of-scope hop)
///    - Otherwise loop with the new URL, up to `max_redirects` hops
/// 3. On 429: parse Retry-After as integer seconds → `RateLimited`
/// 4. On any other non-2xx: `Error` carrying the status
/// 5. On 2xx: gate on content-type before reading the body
///
/// Transport-level failures (DNS, connection refused, timeout) are caught
/// and returned as `Error`; they never propagate as an unhandled fault.
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - The URL to fetch
/// * `scope_prefixes` - Scope prefixes redirect targets must stay within
/// * `max_redirects` - Redirect hop budget
pub async fn fetch_url(
    client: &Client,
    url: &str,
    scope_prefixes: &[String],
    max_redirects: u32,
) -> FetchOutcome {
    let mut current = url.to_string();
    let mut hops = 0u32;

    loop {
        let response = match client.get(&current).send().await {
            Ok(response) => response,
            Err(e) => return classify_transport_error(&e),
        };

        let status = response.status();

        if status.is_redirection() {
            let location = match response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
            {
                Some(location) => location.to_string(),
                None => {
                    return FetchOutcome::Error {
                        reason: Some("Redirect without Location header".to_string()),
                        status: None,
                    }
                }
            };

            let resolved = match resolve_location(&current, &location) {
                Some(resolved) => resolved,
                None => {
                    return FetchOutcome::Error {
                        reason: Some(format!("Unresolvable redirect target: {}", location)),
                        status: None,
                    }
                }
            };

            if !in_scope(&resolved, scope_prefixes) {
                return FetchOutcome::OutOfScope {
                    original_url: url.to_string(),
                    redirected_to: resolved,
                };
            }

            hops += 1;
            if hops > max_redirects {
                return FetchOutcome::Error {
                    reason: Some("Too many redirects".to_string()),
                    status: None,
                };
            }

            tracing::trace!("Redirect hop {}: {} -> {}", hops, current, resolved);
            current = resolved;
            continue;
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            return FetchOutcome::RateLimited {
                retry_after_ms: parse_retry_after(&response),
            };
        }

        if !status.is_success() {
            return FetchOutcome::Error {
                reason: None,
                status: Some(status.as_u16()),
            };
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !is_text_content_type(&content_type) {
            return FetchOutcome::NonText {
                content_type,
                url: current,
            };
        }

        let final_url = response.url().to_string();
        return match response.text().await {
            Ok(body) => FetchOutcome::Success {
                final_url,
                body,
                content_type,
            },
            Err(e) => FetchOutcome::Error {
                reason: Some(e.to_string()),
                status: None,
            },
        };
    }
}

/// Resolves a Location header value against the URL that served it
fn resolve_location(current: &str, location: &str) -> Option<String> {
    let current = Url::parse(current).ok()?;
    let resolved = current.join(location).ok()?;
    Some(resolved.to_string())
}

/// Parses a Retry-After header as integer seconds, converted to
/// milliseconds; a missing or non-numeric header yields None and the
/// caller applies its own default
fn parse_retry_after(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(|seconds| seconds * 1000)
}

/// Checks whether a Content-Type header names a recognized text family
///
/// Recognized: `text/*`, or any value containing `application/json`,
/// `application/xml`, or `application/javascript` (case-insensitive).
fn is_text_content_type(content_type: &str) -> bool {
    let lowered = content_type.to_lowercase();
    lowered.starts_with("text/")
        || lowered.contains("application/json")
        || lowered.contains("application/xml")
        || lowered.contains("application/javascript")
}

/// Maps a transport-level failure onto the closed outcome type
fn classify_transport_error(error: &reqwest::Error) -> FetchOutcome {
    let reason = if error.is_timeout() {
        "Request timeout".to_string()
    } else if error.is_connect() {
        "Connection refused".to_string()
    } else {
        error.to_string()
    };

    FetchOutcome::Error {
        reason: Some(reason),
        status: None,
    }
}
