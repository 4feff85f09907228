//! Retry pipeline behavior, asynchronous mode.

mod helpers;

use fluent_http::{Error, HttpClient, HttpDefaults};
use helpers::mock_server::ScriptedServer;

fn client_for(base_url: &str) -> HttpClient {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    HttpClient::new(
        HttpDefaults::new()
            .with_base_url(base_url)
            .with_verbose(true),
    )
}

#[tokio::test]
async fn server_errors_are_retried_until_success() {
    let server = ScriptedServer::start(vec![503, 503, 200]);

    let response = client_for(server.url())
        .create("/items")
        .retry_with_interval(5, None)
        .get()
        .await
        .expect("request succeeds on third attempt");

    assert_eq!(server.hits(), 3);
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn exhaustion_returns_final_server_error_instead_of_raising() {
    let server = ScriptedServer::start(vec![503]);

    let response = client_for(server.url())
        .create("/items")
        .retry_with_interval(2, None)
        .get()
        .await
        .expect("5xx exhaustion is a response, not an error");

    assert_eq!(server.hits(), 3);
    assert_eq!(response.status().as_u16(), 503);
}

#[tokio::test]
async fn client_errors_are_never_retried() {
    let server = ScriptedServer::start(vec![404, 200]);

    let response = client_for(server.url())
        .create("/items")
        .retry_with_interval(5, None)
        .get()
        .await
        .expect("4xx returns immediately");

    assert_eq!(server.hits(), 1);
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn connect_failure_exhaustion_propagates_original_error() {
    let base_url = ScriptedServer::refused_url();

    let error = client_for(&base_url)
        .create("/items")
        .retry_with_interval(1, None)
        .get()
        .await
        .expect_err("nothing listens on this port");

    assert!(error.is_connectivity(), "unexpected error: {error}");
    match error {
        Error::Transport(e) => assert!(e.is_connect(), "original kind preserved: {e}"),
        other => panic!("expected transport error, got {other}"),
    }
}

#[tokio::test]
async fn dropped_connections_are_retried_then_propagated() {
    let server = ScriptedServer::start_dropping();

    let error = client_for(server.url())
        .create("/items")
        .retry_with_interval(1, None)
        .get()
        .await
        .expect_err("server never answers");

    assert_eq!(server.hits(), 2);
    assert!(matches!(error, Error::Transport(_)));
}

#[tokio::test]
async fn single_attempt_without_retry_config() {
    let server = ScriptedServer::start(vec![503]);

    let response = client_for(server.url())
        .create("/items")
        .get()
        .await
        .expect("single attempt returns the 5xx");

    assert_eq!(server.hits(), 1);
    assert_eq!(response.status().as_u16(), 503);
}

#[tokio::test]
async fn error_for_status_is_an_explicit_conversion() {
    let server = ScriptedServer::start(vec![500]);

    let response = client_for(server.url())
        .create("/items")
        .get()
        .await
        .expect("pipeline never raises on status");

    assert!(response.is_error());
    match response.error_for_status() {
        Err(Error::Status { status, .. }) => assert_eq!(status, 500),
        other => panic!("expected status error, got {other:?}"),
    }
}
