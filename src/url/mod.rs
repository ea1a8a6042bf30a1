//! URL handling module for Kagami-Mirror
//!
//! This module provides URL normalization, scope filtering, and link
//! extraction from fetched document bodies.

mod extract;
mod normalize;

// Re-export main functions
pub use extract::extract_urls;
pub use normalize::{in_scope, normalize_url};
