//! Mirror coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects
//! of a mirror run, including:
//! - Validating the content-root boundary before any I/O
//! - Driving the fetcher per dequeued URL
//! - Recording per-URL provenance and URL aliases
//! - Applying retry, rate-limit, and abort policy
//! - Reconciling against the previous run and persisting metadata
//! - Running the link-rewrite pass over the saved documents

use crate::config::{resolve_content_root, Config};
use crate::crawler::fetcher::{build_http_client, fetch_url, FetchOutcome};
use crate::crawler::queue::CrawlState;
use crate::metadata::{
    build_metadata, load_metadata, mark_removed_items, save_metadata, ItemRecord, ItemStatus,
    RunResult, StatusReason, UrlResolution,
};
use crate::store::{self, SaveOutcome};
use crate::url::{extract_urls, in_scope};
use crate::{rewrite, MirrorError, Result};
use chrono::Utc;
use reqwest::Client;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use url::Url;

/// Identical transient errors tolerated per URL before it is marked failed
const MAX_ERROR_REPEATS: u32 = 3;

/// Consecutive rate-limit responses tolerated before the run aborts
const MAX_CONSECUTIVE_429: u32 = 3;

/// Summary of a completed mirror run
#[derive(Debug)]
pub struct MirrorReport {
    /// Overall run classification
    pub result: RunResult,
    /// URLs that reached a successful fetch
    pub fetched: usize,
    /// URLs that exhausted their retry budget
    pub failed: usize,
    /// Total item records, removed entries included
    pub items: usize,
    /// Documents touched by the link-rewrite pass
    pub rewritten: usize,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

/// Main mirror coordinator structure
#[derive(Debug)]
pub struct Coordinator {
    config: Config,
    client: Client,
    content_root: PathBuf,
    state: CrawlState,
    items: BTreeMap<String, ItemRecord>,
    url_resolution: BTreeMap<String, UrlResolution>,
    rewrite_links: bool,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// The content root is resolved and boundary-checked here, before any
    /// filesystem access: a root escaping the working directory is a
    /// configuration error, not a crawl failure.
    ///
    /// # Arguments
    ///
    /// * `config` - The mirror configuration
    /// * `rewrite_links` - Whether to run the link-rewrite pass at the end
    pub fn new(config: Config, rewrite_links: bool) -> Result<Self> {
        let boundary = match &config.mirror.boundary_dir {
            Some(dir) => PathBuf::from(dir),
            None => std::env::current_dir()?,
        };
        let content_root = resolve_content_root(&config.mirror.content_root, &boundary)?;

        let client = build_http_client(&config.user_agent, config.fetch.request_timeout_secs)?;

        let mut state = CrawlState::new();
        state.enqueue(&config.mirror.seed_url);

        Ok(Self {
            config,
            client,
            content_root,
            state,
            items: BTreeMap::new(),
            url_resolution: BTreeMap::new(),
            rewrite_links,
        })
    }

    /// Runs the full mirror operation
    ///
    /// 1. Load the previous run's metadata (malformed → empty baseline)
    /// 2. Crawl until the queue drains or the abort flag is set
    /// 3. Derive removed-page entries from the previous run
    /// 4. Build and atomically persist the run metadata
    /// 5. Rewrite links in the saved documents
    ///
    /// An aborted run still writes metadata reflecting everything
    /// completed so far.
    pub async fn run(mut self) -> Result<MirrorReport> {
        let started = Instant::now();
        tracing::info!(
            "Mirroring {} into {}",
            self.config.mirror.seed_url,
            self.content_root.display()
        );

        let previous = load_metadata(&self.content_root);

        let mut processed = 0usize;
        loop {
            if self.state.aborted() {
                tracing::warn!("Run aborted; {} URLs left unfetched", self.state.pending());
                break;
            }

            let url = match self.state.dequeue() {
                Some(url) => url,
                None => break,
            };

            if let Err(e) = self.process_url(&url).await {
                tracing::error!("Error processing {}: {}", url, e);
            }

            processed += 1;
            if processed % 10 == 0 {
                tracing::info!(
                    "Progress: {} URLs processed, {} pending, {} fetched",
                    processed,
                    self.state.pending(),
                    self.state.fetched_count()
                );
            }
        }

        let mut items = self.items;
        if let Some(previous) = &previous {
            mark_removed_items(&previous.items, &mut items);
        }

        let metadata = build_metadata(
            &self.config.mirror.seed_url,
            self.config.primary_scope_prefix(),
            items,
            self.url_resolution,
            self.state.aborted(),
        );
        save_metadata(&self.content_root, &metadata)?;

        let rewritten = if self.rewrite_links {
            rewrite::rewrite_all(&self.content_root, &metadata.url_resolution)?
        } else {
            0
        };

        let report = MirrorReport {
            result: metadata.result,
            fetched: self.state.fetched_count(),
            failed: self.state.failed_count(),
            items: metadata.items.len(),
            rewritten,
            elapsed: started.elapsed(),
        };

        tracing::info!(
            "Run finished: {:?}, {} fetched, {} failed, {} items in {:?}",
            report.result,
            report.fetched,
            report.failed,
            report.items,
            report.elapsed
        );

        Ok(report)
    }

    /// Processes a single dequeued URL
    async fn process_url(&mut self, url: &str) -> Result<()> {
        // A URL can be seeded or requeued while configuration narrows the
        // scope; the extractor's filter is not the only line of defense.
        if !in_scope(url, &self.config.mirror.scope_prefixes) {
            tracing::info!("Skipping out-of-scope URL: {}", url);
            self.record_item(
                url.to_string(),
                ItemStatus::Skipped,
                StatusReason::OutOfScope,
            );
            return Ok(());
        }

        let outcome = fetch_url(
            &self.client,
            url,
            &self.config.mirror.scope_prefixes,
            self.config.fetch.max_redirects,
        )
        .await;

        match outcome {
            FetchOutcome::Success {
                final_url,
                body,
                content_type,
            } => {
                self.state.reset_rate_limit_streak();
                self.state.clear_error_streak(url);
                tracing::debug!("Fetched {} ({})", final_url, content_type);
                self.handle_success(url, &final_url, &body)?;
            }

            FetchOutcome::RateLimited { retry_after_ms } => {
                let streak = self.state.record_rate_limited();
                if streak >= MAX_CONSECUTIVE_429 {
                    tracing::warn!(
                        "{} consecutive rate-limit responses; aborting run",
                        streak
                    );
                    self.state.set_aborted();
                    return Ok(());
                }

                let backoff =
                    retry_after_ms.unwrap_or(self.config.fetch.rate_limit_backoff_ms);
                tracing::info!("Rate limited on {}; backing off {}ms", url, backoff);
                tokio::time::sleep(Duration::from_millis(backoff)).await;
                self.state.requeue(url.to_string());
            }

            FetchOutcome::Error { reason, status } => {
                self.state.reset_rate_limit_streak();
                self.handle_error(url, reason, status);
            }

            FetchOutcome::OutOfScope {
                original_url,
                redirected_to,
            } => {
                self.state.reset_rate_limit_streak();
                tracing::info!(
                    "Redirect left scope: {} -> {}",
                    original_url,
                    redirected_to
                );
                self.record_item(
                    original_url,
                    ItemStatus::Skipped,
                    StatusReason::RedirectOutOfScope,
                );
            }

            FetchOutcome::NonText { content_type, url } => {
                self.state.reset_rate_limit_streak();
                tracing::debug!(
                    "Dropping non-text content at {} ({})",
                    url,
                    content_type
                );
            }
        }

        Ok(())
    }

    /// Handles a successful fetch: dedup checks, persistence, discovery
    fn handle_success(&mut self, url: &str, final_url: &str, body: &str) -> Result<()> {
        // A redirect may land on a resource another URL already produced
        if final_url != url && self.state.is_fetched(final_url) {
            tracing::debug!("Redirect duplicate: {} -> {}", url, final_url);
            self.record_item(
                url.to_string(),
                ItemStatus::Skipped,
                StatusReason::RedirectDuplicate,
            );
            if let Some(saved_path) = store::saved_path_for(final_url) {
                self.record_alias(url, final_url, &saved_path);
            }
            return Ok(());
        }

        let saved_path = store::saved_path_for(final_url).ok_or_else(|| MirrorError::Store {
            path: final_url.to_string(),
            message: "URL has no host to derive a path from".to_string(),
        })?;

        // Two distinct URLs can derive the same saved path (`…/dir` vs
        // `…/dir/`); the first arrival owns the path's item record
        if self.items.contains_key(&saved_path) {
            tracing::debug!("Duplicate saved path for {}: {}", url, saved_path);
            self.state.mark_fetched(final_url);
            self.record_item(
                url.to_string(),
                ItemStatus::Skipped,
                StatusReason::Duplicate,
            );
            self.record_alias(url, final_url, &saved_path);
            return Ok(());
        }

        self.state.mark_fetched(final_url);

        let save_outcome = store::save(final_url, body, &self.content_root)?;
        let reason = match save_outcome {
            SaveOutcome::New => StatusReason::New,
            SaveOutcome::Changed => StatusReason::Changed,
            SaveOutcome::Unchanged => StatusReason::Unchanged,
        };
        self.record_item(saved_path.clone(), ItemStatus::Success, reason);
        self.record_alias(url, final_url, &saved_path);

        match Url::parse(final_url) {
            Ok(base) => {
                let discovered = extract_urls(body, &base, &self.config.mirror.scope_prefixes);
                tracing::debug!("Discovered {} candidate URLs in {}", discovered.len(), final_url);
                for candidate in discovered {
                    self.state.enqueue(&candidate);
                }
            }
            Err(e) => {
                tracing::warn!("Cannot use {} as extraction base: {}", final_url, e);
            }
        }

        Ok(())
    }

    /// Handles an error outcome: terminal statuses and bounded retries
    fn handle_error(&mut self, url: &str, reason: Option<String>, status: Option<u16>) {
        // 404/406 mean the resource does not exist rather than a
        // transient condition
        if matches!(status, Some(404) | Some(406)) {
            tracing::info!("Dead link ({}): {}", status.unwrap_or_default(), url);
            self.state.mark_failed(url);
            self.record_item(url.to_string(), ItemStatus::Failed, StatusReason::HttpError);
            return;
        }

        let signature = match (status, &reason) {
            (Some(status), _) => status.to_string(),
            (None, Some(reason)) => reason.clone(),
            (None, None) => "unknown error".to_string(),
        };

        let streak = self.state.record_error(url, &signature);
        if streak >= MAX_ERROR_REPEATS {
            tracing::warn!(
                "Giving up on {} after {} consecutive '{}' errors",
                url,
                streak,
                signature
            );
            self.state.mark_failed(url);
            self.record_item(url.to_string(), ItemStatus::Failed, StatusReason::HttpError);
        } else {
            tracing::debug!(
                "Transient error on {} ('{}', attempt {}); requeueing",
                url,
                signature,
                streak
            );
            self.state.requeue(url.to_string());
        }
    }

    /// Records one provenance item with the current timestamp
    fn record_item(&mut self, key: String, status: ItemStatus, reason: StatusReason) {
        self.items
            .insert(key, ItemRecord::new(status, reason, Utc::now()));
    }

    /// Records `urlResolution` entries for both forms of a resource's URL
    fn record_alias(&mut self, url: &str, final_url: &str, saved_path: &str) {
        let resolution = UrlResolution {
            final_url: final_url.to_string(),
            saved_path: saved_path.to_string(),
        };
        self.url_resolution
            .insert(url.to_string(), resolution.clone());
        self.url_resolution
            .insert(final_url.to_string(), resolution);
    }
}

/// Runs the full mirror operation
///
/// This is the side-effect-scoped entry point: it validates the content
/// root, crawls, reconciles, persists metadata, and rewrites links.
///
/// # Arguments
///
/// * `config` - The mirror configuration
/// * `rewrite_links` - Whether to run the link-rewrite pass at the end
///
/// # Returns
///
/// * `Ok(MirrorReport)` - The run summary (including aborted runs)
/// * `Err(MirrorError)` - A fatal configuration or I/O error
pub async fn run_mirror(config: Config, rewrite_links: bool) -> Result<MirrorReport> {
    let coordinator = Coordinator::new(config, rewrite_links)?;
    coordinator.run().await
}
