mod common;

use axum::http::{header, StatusCode};
use common::{TestApp, TEST_ADMIN_PASSWORD, TEST_ADMIN_USERNAME};
use serde_json::json;

#[tokio::test]
async fn login_page_renders() {
    let mut app = TestApp::spawn();

    let response = app.get("/login").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.text().contains("login-form"));
}

#[tokio::test]
async fn login_with_json_succeeds() {
    let mut app = TestApp::spawn();

    let response = app
        .post_json(
            "/login",
            json!({ "username": TEST_ADMIN_USERNAME, "password": TEST_ADMIN_PASSWORD }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json(),
        json!({ "success": true, "message": "Login successful" })
    );
    assert_eq!(app.get("/api/invoices").await.status, StatusCode::OK);
}

#[tokio::test]
async fn login_with_form_succeeds() {
    let mut app = TestApp::spawn();

    let response = app
        .post_form("/login", "username=admin&password=correct-horse-battery")
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(app.get("/").await.status, StatusCode::OK);
}

#[tokio::test]
async fn wrong_credentials_are_rejected() {
    let mut app = TestApp::spawn();

    let wrong_password = app
        .post_json(
            "/login",
            json!({ "username": TEST_ADMIN_USERNAME, "password": "nope" }),
        )
        .await;
    let missing_fields = app.post_json("/login", json!({})).await;
    let non_string_username = app
        .post_json("/login", json!({ "username": 5, "password": TEST_ADMIN_PASSWORD }))
        .await;
    let non_string_password = app
        .post_json(
            "/login",
            json!({ "username": TEST_ADMIN_USERNAME, "password": ["x"] }),
        )
        .await;

    for response in [
        wrong_password,
        missing_fields,
        non_string_username,
        non_string_password,
    ] {
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.json(),
            json!({ "success": false, "error": "Invalid username or password" })
        );
    }
    assert_eq!(
        app.get("/api/invoices").await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn api_requires_session() {
    let mut app = TestApp::spawn();

    for uri in [
        "/api/invoices",
        "/api/invoices/monthly",
        "/api/invoices/export/csv",
        "/api/invoices/65a4f0c2e13b7a0012345678",
    ] {
        let response = app.get(uri).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(
            response.json(),
            json!({ "success": false, "error": "Authentication required" })
        );
    }
}

#[tokio::test]
async fn dashboard_redirects_to_login() {
    let mut app = TestApp::spawn();

    let response = app.get("/").await;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.header(header::LOCATION), Some("/login"));
}

#[tokio::test]
async fn dashboard_renders_after_login() {
    let mut app = TestApp::logged_in().await;

    let response = app.get("/").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.text().contains("Signed in as admin"));
}

#[tokio::test]
async fn logout_ends_session() {
    let mut app = TestApp::logged_in().await;

    let response = app.get("/logout").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.header(header::LOCATION), Some("/login"));

    assert_eq!(
        app.get("/api/invoices").await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn favicons_redirect_to_static() {
    let mut app = TestApp::spawn();

    let ico = app.get("/favicon.ico").await;
    let png = app.get("/favicon.png").await;

    assert_eq!(ico.header(header::LOCATION), Some("/static/favicon.ico"));
    assert_eq!(png.header(header::LOCATION), Some("/static/favicon.png"));
    assert_eq!(app.get("/static/favicon.png").await.status, StatusCode::OK);
}
