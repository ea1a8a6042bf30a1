use serde::Deserialize;

/// Main configuration structure for Kagami-Mirror
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mirror: MirrorConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
}

/// What to mirror and where to put it
#[derive(Debug, Clone, Deserialize)]
pub struct MirrorConfig {
    /// URL the crawl starts from
    #[serde(rename = "seed-url")]
    pub seed_url: String,

    /// URL prefixes a candidate must start with to be crawled
    ///
    /// Defaults to the seed URL itself when omitted. Multiple prefixes
    /// support cross-domain allow-lists.
    #[serde(rename = "scope-prefixes", default)]
    pub scope_prefixes: Vec<String>,

    /// Directory the mirrored documents are written under
    ///
    /// Resolved against the boundary directory and required to stay
    /// inside it. Default: `./mirror`
    #[serde(rename = "content-root", default = "default_content_root")]
    pub content_root: String,

    /// Boundary directory the resolved content root must stay within
    ///
    /// Defaults to the process working directory when omitted.
    #[serde(rename = "boundary-dir", default)]
    pub boundary_dir: Option<String>,
}

/// Fetch behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Redirect hop budget per logical fetch (default 10)
    #[serde(rename = "max-redirects")]
    pub max_redirects: u32,

    /// Whole-request timeout in seconds (default 30)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// Backoff applied after HTTP 429 when no Retry-After header is
    /// present, in milliseconds (default 5000)
    #[serde(rename = "rate-limit-backoff-ms")]
    pub rate_limit_backoff_ms: u64,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the mirror tool
    pub name: String,

    /// Version advertised in the user agent string
    pub version: String,

    /// URL with information about the tool
    #[serde(rename = "contact-url")]
    pub contact_url: String,
}

fn default_content_root() -> String {
    "./mirror".to_string()
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_redirects: 10,
            request_timeout_secs: 30,
            rate_limit_backoff_ms: 5000,
        }
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            name: "KagamiMirror".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://github.com/kagami-mirror/kagami-mirror".to_string(),
        }
    }
}

impl Config {
    /// The primary scope prefix, recorded in the run metadata
    pub fn primary_scope_prefix(&self) -> &str {
        self.mirror
            .scope_prefixes
            .first()
            .map(String::as_str)
            .unwrap_or(&self.mirror.seed_url)
    }
}
