//! Configuration module for Kagami-Mirror
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, including the content-root boundary check.
//!
//! # Example
//!
//! ```no_run
//! use kagami_mirror::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("mirror.toml")).unwrap();
//! println!("Mirroring from: {}", config.mirror.seed_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, FetchConfig, MirrorConfig, UserAgentConfig};

// Re-export parser and validation functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::{resolve_content_root, validate};
