mod common;

use axum::http::{header, StatusCode};
use common::TestApp;

#[tokio::test]
async fn health_check_works() {
    let mut app = TestApp::spawn();

    let response = app.get("/health").await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "invoice-service");
}

#[tokio::test]
async fn readiness_reflects_store() {
    let mut ready = TestApp::spawn();
    let mut unconfigured = TestApp::without_store();

    assert_eq!(ready.get("/ready").await.status, StatusCode::OK);
    assert_eq!(
        unconfigured.get("/ready").await.status,
        StatusCode::SERVICE_UNAVAILABLE
    );
}

#[tokio::test]
async fn metrics_endpoint_is_plain_text() {
    let mut app = TestApp::spawn();

    let response = app.get("/metrics").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response
        .header(header::CONTENT_TYPE)
        .is_some_and(|ct| ct.starts_with("text/plain")));
}

#[tokio::test]
async fn responses_carry_request_id() {
    let mut app = TestApp::spawn();

    let response = app.get("/health").await;

    assert!(response.headers.contains_key("x-request-id"));
    assert_eq!(response.header(header::X_CONTENT_TYPE_OPTIONS), Some("nosniff"));
}
