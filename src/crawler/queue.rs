//! Crawl queue and per-invocation state
//!
//! This module owns all mutable crawl state for one mirror invocation:
//! - The FIFO worklist of URLs awaiting fetch, with an O(1) membership mirror
//! - The fetched and failed sets
//! - Per-URL consecutive-error tracking keyed by an error signature
//! - The process-wide consecutive-429 circuit breaker
//!
//! A URL is in at most one of {queued, fetched, failed} at any time, and the
//! `queue` and `queued` structures always agree on membership.

use crate::url::normalize_url;
use std::collections::{HashMap, HashSet, VecDeque};

/// Consecutive-error tracking for one URL
///
/// The counter is reset whenever the error signature changes, bounding
/// retries per failure mode without a global attempt cap.
#[derive(Debug, Clone)]
pub struct ErrorStreak {
    /// Consecutive occurrences of the current signature
    pub count: u32,
    /// HTTP status as a string if present, else the error reason
    pub signature: String,
}

/// Mutable state for one crawl invocation
///
/// Constructed per invocation and threaded through all queue operations;
/// discarded when the crawl ends.
#[derive(Debug, Default)]
pub struct CrawlState {
    queue: VecDeque<String>,
    queued: HashSet<String>,
    fetched: HashSet<String>,
    failed: HashSet<String>,
    error_streaks: HashMap<String, ErrorStreak>,
    consecutive_429: u32,
    aborted: bool,
}

impl CrawlState {
    /// Creates an empty crawl state
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a URL for fetching
    ///
    /// The URL is normalized (parsed, fragment stripped) first. The call is
    /// a silent no-op if normalization fails or the URL is already queued,
    /// fetched, or failed.
    pub fn enqueue(&mut self, url: &str) {
        let normalized = match normalize_url(url) {
            Ok(normalized) => normalized.to_string(),
            Err(e) => {
                tracing::debug!("Not queueing {}: {}", url, e);
                return;
            }
        };

        if self.queued.contains(&normalized)
            || self.fetched.contains(&normalized)
            || self.failed.contains(&normalized)
        {
            return;
        }

        self.queued.insert(normalized.clone());
        self.queue.push_back(normalized);
    }

    /// Removes and returns the next URL in discovery order
    pub fn dequeue(&mut self) -> Option<String> {
        let url = self.queue.pop_front()?;
        self.queued.remove(&url);
        Some(url)
    }

    /// Re-appends an already-dequeued URL to the tail of the queue
    ///
    /// Appending to the tail rather than the head ensures fair progress
    /// across all pending URLs rather than hot-looping one failing URL.
    pub fn requeue(&mut self, url: String) {
        if self.queued.insert(url.clone()) {
            self.queue.push_back(url);
        }
    }

    /// Marks a URL as successfully fetched
    ///
    /// The URL is also removed from the pending queue if present: a
    /// redirect target may already be independently queued, and the fetched
    /// outcome takes precedence over redundant future fetch attempts.
    pub fn mark_fetched(&mut self, url: &str) {
        if self.queued.remove(url) {
            self.queue.retain(|queued| queued != url);
        }
        self.fetched.insert(url.to_string());
        self.error_streaks.remove(url);
    }

    /// Marks a URL as having exhausted its retry budget
    pub fn mark_failed(&mut self, url: &str) {
        self.failed.insert(url.to_string());
        self.error_streaks.remove(url);
    }

    /// Records an error outcome for a URL, returning the streak length
    ///
    /// A change in signature resets the streak to one.
    pub fn record_error(&mut self, url: &str, signature: &str) -> u32 {
        let streak = self
            .error_streaks
            .entry(url.to_string())
            .or_insert_with(|| ErrorStreak {
                count: 0,
                signature: signature.to_string(),
            });

        if streak.signature == signature {
            streak.count += 1;
        } else {
            streak.signature = signature.to_string();
            streak.count = 1;
        }

        streak.count
    }

    /// Clears a URL's error streak
    ///
    /// Called when a fetch of the URL succeeds, so a later transient error
    /// starts a fresh streak.
    pub fn clear_error_streak(&mut self, url: &str) {
        self.error_streaks.remove(url);
    }

    /// Records a rate-limited outcome, returning the consecutive-429 count
    pub fn record_rate_limited(&mut self) -> u32 {
        self.consecutive_429 += 1;
        self.consecutive_429
    }

    /// Resets the consecutive-429 counter
    ///
    /// Called on any non-rate-limited outcome; only rate-limit responses
    /// count toward the abort streak.
    pub fn reset_rate_limit_streak(&mut self) {
        self.consecutive_429 = 0;
    }

    /// Sets the abort flag, stopping the loop before its next iteration
    pub fn set_aborted(&mut self) {
        self.aborted = true;
    }

    /// Returns whether the crawl was aborted
    pub fn aborted(&self) -> bool {
        self.aborted
    }

    /// Returns whether a URL already reached a successful fetch
    pub fn is_fetched(&self, url: &str) -> bool {
        self.fetched.contains(url)
    }

    /// Returns the number of URLs awaiting fetch
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Returns whether the worklist is empty
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns the number of successfully fetched URLs
    pub fn fetched_count(&self) -> usize {
        self.fetched.len()
    }

    /// Returns the number of failed URLs
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }
}
