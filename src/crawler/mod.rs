//! Crawler module for fetching and mirroring pages
//!
//! This module contains the core crawl logic, including:
//! - HTTP fetching with manual, scope-checked redirect handling
//! - The FIFO crawl queue and per-invocation state
//! - Retry, rate-limit, and abort policy
//! - Overall mirror coordination

mod coordinator;
mod fetcher;
mod queue;

pub use coordinator::{run_mirror, Coordinator, MirrorReport};
pub use fetcher::{build_http_client, fetch_url, FetchOutcome};
pub use queue::{CrawlState, ErrorStreak};
