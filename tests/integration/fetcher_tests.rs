//! Fetcher-level integration tests against a mock server

use kagami_mirror::config::UserAgentConfig;
use kagami_mirror::crawler::{build_http_client, fetch_url, FetchOutcome};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn scopes(server: &MockServer) -> Vec<String> {
    vec![format!("{}/", server.uri())]
}

fn client() -> reqwest::Client {
    build_http_client(&UserAgentConfig::default(), 5).unwrap()
}

#[tokio::test]
async fn test_redirect_chain_in_scope_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/new"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("moved here")
                .insert_header("content-type", "text/markdown"),
        )
        .mount(&server)
        .await;

    let url = format!("{}/old", server.uri());
    let outcome = fetch_url(&client(), &url, &scopes(&server), 10).await;

    match outcome {
        FetchOutcome::Success {
            final_url, body, ..
        } => {
            assert_eq!(final_url, format!("{}/new", server.uri()));
            assert_eq!(body, "moved here");
        }
        other => panic!("Expected Success, got {:?}", other),
    }
}

#[tokio::test]
async fn test_redirect_out_of_scope_stops_before_following() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/away"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("location", "https://external.example.com/x"),
        )
        .mount(&server)
        .await;

    let url = format!("{}/away", server.uri());
    let outcome = fetch_url(&client(), &url, &scopes(&server), 10).await;

    match outcome {
        FetchOutcome::OutOfScope {
            original_url,
            redirected_to,
        } => {
            assert_eq!(original_url, url);
            assert_eq!(redirected_to, "https://external.example.com/x");
        }
        other => panic!("Expected OutOfScope, got {:?}", other),
    }
}

#[tokio::test]
async fn test_redirect_without_location_is_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(302))
        .mount(&server)
        .await;

    let url = format!("{}/broken", server.uri());
    let outcome = fetch_url(&client(), &url, &scopes(&server), 10).await;

    match outcome {
        FetchOutcome::Error { reason, status } => {
            assert_eq!(reason.as_deref(), Some("Redirect without Location header"));
            assert_eq!(status, None);
        }
        other => panic!("Expected Error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_redirect_loop_exhausts_hop_budget() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/loop"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/loop"))
        .mount(&server)
        .await;

    let url = format!("{}/loop", server.uri());
    let outcome = fetch_url(&client(), &url, &scopes(&server), 5).await;

    match outcome {
        FetchOutcome::Error { reason, .. } => {
            assert_eq!(reason.as_deref(), Some("Too many redirects"));
        }
        other => panic!("Expected Error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_rate_limited_with_retry_after() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "5"))
        .mount(&server)
        .await;

    let url = format!("{}/busy", server.uri());
    let outcome = fetch_url(&client(), &url, &scopes(&server), 10).await;

    match outcome {
        FetchOutcome::RateLimited { retry_after_ms } => {
            assert_eq!(retry_after_ms, Some(5000));
        }
        other => panic!("Expected RateLimited, got {:?}", other),
    }
}

#[tokio::test]
async fn test_rate_limited_without_retry_after() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let url = format!("{}/busy", server.uri());
    let outcome = fetch_url(&client(), &url, &scopes(&server), 10).await;

    match outcome {
        FetchOutcome::RateLimited { retry_after_ms } => {
            assert_eq!(retry_after_ms, None);
        }
        other => panic!("Expected RateLimited, got {:?}", other),
    }
}

#[tokio::test]
async fn test_non_numeric_retry_after_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(
            ResponseTemplate::new(429).insert_header("retry-after", "Wed, 21 Oct 2026 07:28:00 GMT"),
        )
        .mount(&server)
        .await;

    let url = format!("{}/busy", server.uri());
    let outcome = fetch_url(&client(), &url, &scopes(&server), 10).await;

    match outcome {
        FetchOutcome::RateLimited { retry_after_ms } => {
            assert_eq!(retry_after_ms, None);
        }
        other => panic!("Expected RateLimited, got {:?}", other),
    }
}

#[tokio::test]
async fn test_http_error_carries_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let url = format!("{}/gone", server.uri());
    let outcome = fetch_url(&client(), &url, &scopes(&server), 10).await;

    match outcome {
        FetchOutcome::Error { reason, status } => {
            assert_eq!(status, Some(404));
            assert_eq!(reason, None);
        }
        other => panic!("Expected Error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_binary_content_type_is_non_text() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/logo.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0x89, 0x50, 0x4e, 0x47])
                .insert_header("content-type", "image/png"),
        )
        .mount(&server)
        .await;

    let url = format!("{}/logo.png", server.uri());
    let outcome = fetch_url(&client(), &url, &scopes(&server), 10).await;

    match outcome {
        FetchOutcome::NonText { content_type, url } => {
            assert_eq!(content_type, "image/png");
            assert_eq!(url, format!("{}/logo.png", server.uri()));
        }
        other => panic!("Expected NonText, got {:?}", other),
    }
}

#[tokio::test]
async fn test_connection_failure_is_error() {
    // Port 1 on localhost refuses connections
    let outcome = fetch_url(
        &client(),
        "http://127.0.0.1:1/unreachable",
        &["http://127.0.0.1:1/".to_string()],
        10,
    )
    .await;

    match outcome {
        FetchOutcome::Error { reason, status } => {
            assert!(reason.is_some());
            assert_eq!(status, None);
        }
        other => panic!("Expected Error, got {:?}", other),
    }
}
