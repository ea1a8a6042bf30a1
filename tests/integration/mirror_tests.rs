//! End-to-end mirror tests
//!
//! Each test stands up a mock documentation site, runs a full mirror into
//! a temp directory, and inspects the saved tree and persisted metadata.

use kagami_mirror::config::{Config, FetchConfig, MirrorConfig, UserAgentConfig};
use kagami_mirror::crawler::run_mirror;
use kagami_mirror::metadata::{load_metadata, ItemStatus, RunResult, StatusReason};
use kagami_mirror::store::saved_path_for;
use std::path::PathBuf;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration rooted inside a temp directory
fn test_config(server: &MockServer, boundary: &TempDir) -> Config {
    Config {
        mirror: MirrorConfig {
            seed_url: format!("{}/", server.uri()),
            scope_prefixes: vec![format!("{}/", server.uri())],
            content_root: "mirror".to_string(),
            boundary_dir: Some(boundary.path().display().to_string()),
        },
        fetch: FetchConfig {
            max_redirects: 10,
            request_timeout_secs: 5,
            // Keep retry sleeps negligible in tests
            rate_limit_backoff_ms: 10,
        },
        user_agent: UserAgentConfig::default(),
    }
}

fn content_root(boundary: &TempDir) -> PathBuf {
    boundary.path().join("mirror")
}

/// The per-host directory the mock server's documents land under
fn host_dir(server: &MockServer) -> String {
    let index = saved_path_for(&format!("{}/", server.uri())).unwrap();
    index.trim_end_matches("/index.md").to_string()
}

async fn mount_page(server: &MockServer, at: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/markdown"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_mirror_of_linked_pages() {
    let server = MockServer::start().await;
    let boundary = TempDir::new().unwrap();

    mount_page(
        &server,
        "/",
        "# Home\n\n[Page one](/page1)\n[Readme](/docs/readme.md)\n",
    )
    .await;
    mount_page(&server, "/page1", "page one content\n").await;
    mount_page(&server, "/docs/readme.md", "readme\n").await;

    let report = run_mirror(test_config(&server, &boundary), false)
        .await
        .unwrap();

    assert_eq!(report.result, RunResult::Success);
    assert_eq!(report.fetched, 3);
    assert_eq!(report.failed, 0);

    let root = content_root(&boundary);
    let host = host_dir(&server);
    assert!(root.join(format!("{}/index.md", host)).exists());
    assert!(root.join(format!("{}/page1/index.md", host)).exists());
    assert!(root.join(format!("{}/docs/readme.md", host)).exists());

    let metadata = load_metadata(&root).unwrap();
    assert_eq!(metadata.items.len(), 3);
    assert_eq!(metadata.stats["success"], 3);
    assert_eq!(metadata.stats["success.new"], 3);
    assert_eq!(metadata.stats["uniqueUrls"], 3);
    assert!(metadata
        .items
        .values()
        .all(|item| item.status == ItemStatus::Success));
}

#[tokio::test]
async fn test_rerun_is_idempotent_and_flags_removed_pages() {
    let server = MockServer::start().await;
    let boundary = TempDir::new().unwrap();
    let host = host_dir(&server);

    mount_page(&server, "/", "# Home\n\n[A](/a)\n").await;
    mount_page(&server, "/a", "content of a\n").await;

    let report = run_mirror(test_config(&server, &boundary), false)
        .await
        .unwrap();
    assert_eq!(report.result, RunResult::Success);
    assert_eq!(report.fetched, 2);

    let root = content_root(&boundary);
    let first = load_metadata(&root).unwrap();
    let a_key = format!("{}/a/index.md", host);
    let first_fetched_at = first.items[&a_key].fetched_at;

    // The site drops the link to /a; the page disappears from the crawl
    server.reset().await;
    mount_page(&server, "/", "# Home, now without links\n").await;

    let report = run_mirror(test_config(&server, &boundary), false)
        .await
        .unwrap();
    assert_eq!(report.result, RunResult::Success);
    assert_eq!(report.fetched, 1);

    let second = load_metadata(&root).unwrap();

    // Seed content changed; /a was not revisited and is flagged, not
    // deleted
    let seed_key = format!("{}/index.md", host);
    assert_eq!(second.items[&seed_key].status_reason, StatusReason::Changed);
    assert_eq!(second.items[&a_key].status_reason, StatusReason::Removed);
    assert_eq!(second.items[&a_key].fetched_at, first_fetched_at);
    assert!(root.join(&a_key).exists());
    assert_eq!(second.stats["success.removed"], 1);
}

#[tokio::test]
async fn test_unchanged_page_not_rewritten() {
    let server = MockServer::start().await;
    let boundary = TempDir::new().unwrap();

    mount_page(&server, "/", "stable content\n").await;

    run_mirror(test_config(&server, &boundary), false)
        .await
        .unwrap();
    let report = run_mirror(test_config(&server, &boundary), false)
        .await
        .unwrap();

    assert_eq!(report.result, RunResult::Success);
    let metadata = load_metadata(&content_root(&boundary)).unwrap();
    assert_eq!(metadata.stats["success.unchanged"], 1);
}

#[tokio::test]
async fn test_redirect_target_saved_and_aliased() {
    let server = MockServer::start().await;
    let boundary = TempDir::new().unwrap();
    let host = host_dir(&server);

    mount_page(&server, "/", "[moved](/old)\n").await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/new"))
        .mount(&server)
        .await;
    mount_page(&server, "/new", "moved here\n").await;

    let report = run_mirror(test_config(&server, &boundary), false)
        .await
        .unwrap();

    assert_eq!(report.result, RunResult::Success);
    assert_eq!(report.fetched, 2);

    let root = content_root(&boundary);
    let new_key = format!("{}/new/index.md", host);
    assert!(root.join(&new_key).exists());

    let metadata = load_metadata(&root).unwrap();
    assert_eq!(metadata.items[&new_key].status_reason, StatusReason::New);

    // Both the pre-redirect and canonical forms resolve to the saved path
    let old_url = format!("{}/old", server.uri());
    let new_url = format!("{}/new", server.uri());
    assert_eq!(metadata.url_resolution[&old_url].saved_path, new_key);
    assert_eq!(metadata.url_resolution[&old_url].final_url, new_url);
    assert_eq!(metadata.url_resolution[&new_url].saved_path, new_key);
}

#[tokio::test]
async fn test_out_of_scope_redirect_recorded_as_skipped() {
    let server = MockServer::start().await;
    let boundary = TempDir::new().unwrap();

    mount_page(&server, "/", "[away](/away)\n").await;
    Mock::given(method("GET"))
        .and(path("/away"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("location", "https://external.example.com/x"),
        )
        .mount(&server)
        .await;

    let report = run_mirror(test_config(&server, &boundary), false)
        .await
        .unwrap();

    assert_eq!(report.result, RunResult::Success);

    let metadata = load_metadata(&content_root(&boundary)).unwrap();
    let away_url = format!("{}/away", server.uri());
    assert_eq!(metadata.items[&away_url].status, ItemStatus::Skipped);
    assert_eq!(
        metadata.items[&away_url].status_reason,
        StatusReason::RedirectOutOfScope
    );
}

#[tokio::test]
async fn test_equivalent_urls_deduplicate_on_saved_path() {
    let server = MockServer::start().await;
    let boundary = TempDir::new().unwrap();
    let host = host_dir(&server);

    mount_page(&server, "/", "[a](/dir)\n[b](/dir/)\n").await;
    mount_page(&server, "/dir", "dir content\n").await;
    mount_page(&server, "/dir/", "dir content\n").await;

    let report = run_mirror(test_config(&server, &boundary), false)
        .await
        .unwrap();

    assert_eq!(report.result, RunResult::Success);

    let metadata = load_metadata(&content_root(&boundary)).unwrap();
    let dir_key = format!("{}/dir/index.md", host);
    assert_eq!(metadata.items[&dir_key].status, ItemStatus::Success);
    assert_eq!(metadata.stats["skipped.duplicate"], 1);
}

#[tokio::test]
async fn test_dead_link_is_terminal_and_run_partial() {
    let server = MockServer::start().await;
    let boundary = TempDir::new().unwrap();

    mount_page(&server, "/", "[missing](/missing)\n").await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let report = run_mirror(test_config(&server, &boundary), false)
        .await
        .unwrap();

    assert_eq!(report.result, RunResult::Partial);
    assert_eq!(report.failed, 1);

    let metadata = load_metadata(&content_root(&boundary)).unwrap();
    let missing_url = format!("{}/missing", server.uri());
    assert_eq!(metadata.items[&missing_url].status, ItemStatus::Failed);
    assert_eq!(
        metadata.items[&missing_url].status_reason,
        StatusReason::HttpError
    );
}

#[tokio::test]
async fn test_repeated_server_errors_exhaust_retry_budget() {
    let server = MockServer::start().await;
    let boundary = TempDir::new().unwrap();

    mount_page(&server, "/", "[flaky](/flaky)\n").await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let report = run_mirror(test_config(&server, &boundary), false)
        .await
        .unwrap();

    assert_eq!(report.result, RunResult::Partial);
    assert_eq!(report.failed, 1);
}

#[tokio::test]
async fn test_transient_error_recovers_on_retry() {
    let server = MockServer::start().await;
    let boundary = TempDir::new().unwrap();
    let host = host_dir(&server);

    mount_page(&server, "/", "[flaky](/flaky)\n").await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_page(&server, "/flaky", "finally up\n").await;

    let report = run_mirror(test_config(&server, &boundary), false)
        .await
        .unwrap();

    assert_eq!(report.result, RunResult::Success);
    assert_eq!(report.fetched, 2);
    assert!(content_root(&boundary)
        .join(format!("{}/flaky/index.md", host))
        .exists());
}

#[tokio::test]
async fn test_three_consecutive_rate_limits_abort_the_run() {
    let server = MockServer::start().await;
    let boundary = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;

    let report = run_mirror(test_config(&server, &boundary), false)
        .await
        .unwrap();

    assert_eq!(report.result, RunResult::Aborted);

    // An aborted run still persists metadata for everything completed
    let metadata = load_metadata(&content_root(&boundary)).unwrap();
    assert_eq!(metadata.result, RunResult::Aborted);
}

#[tokio::test]
async fn test_rate_limit_streak_broken_by_success() {
    let server = MockServer::start().await;
    let boundary = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_page(&server, "/", "eventually served\n").await;

    let report = run_mirror(test_config(&server, &boundary), false)
        .await
        .unwrap();

    assert_eq!(report.result, RunResult::Success);
    assert_eq!(report.fetched, 1);
}

#[tokio::test]
async fn test_non_text_resources_are_dropped() {
    let server = MockServer::start().await;
    let boundary = TempDir::new().unwrap();

    mount_page(&server, "/", "[logo](/logo.png)\n").await;
    Mock::given(method("GET"))
        .and(path("/logo.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0x89, 0x50])
                .insert_header("content-type", "image/png"),
        )
        .mount(&server)
        .await;

    let report = run_mirror(test_config(&server, &boundary), false)
        .await
        .unwrap();

    assert_eq!(report.result, RunResult::Success);
    assert_eq!(report.fetched, 1);

    // Never a candidate for local storage: no item record at all
    let metadata = load_metadata(&content_root(&boundary)).unwrap();
    assert_eq!(metadata.items.len(), 1);
}

#[tokio::test]
async fn test_links_rewritten_to_relative_paths() {
    let server = MockServer::start().await;
    let boundary = TempDir::new().unwrap();
    let host = host_dir(&server);

    let seed_body = format!(
        "[guide]({uri}/guide)\n[external](https://external.example.com/x)\n",
        uri = server.uri()
    );
    mount_page(&server, "/", &seed_body).await;
    mount_page(&server, "/guide", "the guide\n").await;

    let report = run_mirror(test_config(&server, &boundary), true)
        .await
        .unwrap();

    assert_eq!(report.result, RunResult::Success);
    assert_eq!(report.rewritten, 1);

    let seed_path = content_root(&boundary).join(format!("{}/index.md", host));
    let rewritten = std::fs::read_to_string(seed_path).unwrap();
    assert!(rewritten.contains("[guide](guide/index.md)"));
    // Links with no local counterpart stay absolute
    assert!(rewritten.contains("[external](https://external.example.com/x)"));
}

#[tokio::test]
async fn test_rewrite_resolves_pre_redirect_aliases() {
    let server = MockServer::start().await;
    let boundary = TempDir::new().unwrap();
    let host = host_dir(&server);

    let seed_body = format!("[moved]({uri}/old)\n", uri = server.uri());
    mount_page(&server, "/", &seed_body).await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/new"))
        .mount(&server)
        .await;
    mount_page(&server, "/new", "moved here\n").await;

    let report = run_mirror(test_config(&server, &boundary), true)
        .await
        .unwrap();

    assert_eq!(report.result, RunResult::Success);

    let seed_path = content_root(&boundary).join(format!("{}/index.md", host));
    let rewritten = std::fs::read_to_string(seed_path).unwrap();
    assert!(rewritten.contains("[moved](new/index.md)"));
}
