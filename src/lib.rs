//! Kagami-Mirror: an incremental documentation site mirror
//!
//! This crate implements a crawler that mirrors a scoped subset of a remote
//! documentation site to local storage, tracking per-URL provenance across
//! repeated runs so that unchanged pages are not rewritten and disappeared
//! pages are flagged rather than deleted.

pub mod config;
pub mod crawler;
pub mod metadata;
pub mod rewrite;
pub mod store;
pub mod url;

use thiserror::Error;

/// Main error type for Kagami-Mirror operations
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Metadata serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Content store error for {path}: {message}")]
    Store { path: String, message: String },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Content root {root} escapes the allowed boundary {boundary}")]
    BoundaryViolation { root: String, boundary: String },
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("URL is outside every configured scope prefix: {0}")]
    OutOfScope(String),
}

/// Result type alias for Kagami-Mirror operations
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_mirror, FetchOutcome, MirrorReport};
pub use metadata::{CrawlMetadata, ItemRecord, ItemStatus, RunResult, StatusReason};
pub use crate::url::{extract_urls, in_scope, normalize_url};
