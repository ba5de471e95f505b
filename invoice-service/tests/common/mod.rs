//! Test helpers for invoice-service integration tests.
//!
//! Builds the real router over an in-memory repository and drives it with
//! `tower::ServiceExt::oneshot`, carrying the session cookie between calls.

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body, Bytes},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use invoice_service::config::{AdminConfig, InvoiceConfig, MongoConfig, SessionConfig};
use invoice_service::services::{
    AuthProvider, InMemoryInvoiceRepository, InvoiceRepository, MongoDb, MongoInvoiceRepository,
    StaticAdminAuth,
};
use invoice_service::startup::SESSION_COOKIE_NAME;
use invoice_service::{build_router, AppState};
use mongodb::bson::Document;
use secrecy::Secret;
use serde_json::{json, Value};
use service_core::config::{Config as CoreConfig, Environment};
use std::sync::Arc;
use tower::ServiceExt;

pub const TEST_ADMIN_USERNAME: &str = "admin";
pub const TEST_ADMIN_PASSWORD: &str = "correct-horse-battery";

pub fn test_config(mongo_uri: Option<String>) -> InvoiceConfig {
    InvoiceConfig {
        common: CoreConfig {
            port: 0,
            environment: Environment::Dev,
        },
        mongodb: MongoConfig {
            uri: mongo_uri,
            database: "invoice_test".to_string(),
        },
        admin: AdminConfig {
            username: Some(TEST_ADMIN_USERNAME.to_string()),
            password: Some(Secret::new(TEST_ADMIN_PASSWORD.to_string())),
        },
        session: SessionConfig {
            secret: Secret::new("test-session-secret".to_string()),
            secure_cookie: false,
        },
        static_dir: concat!(env!("CARGO_MANIFEST_DIR"), "/static").to_string(),
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("Response body is not JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.to_vec()).expect("Response body is not UTF-8")
    }

    pub fn header(&self, name: header::HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Test application with one router (and so one session store).
pub struct TestApp {
    pub router: Router,
    pub invoices: Arc<dyn InvoiceRepository>,
    cookie: Option<String>,
}

impl TestApp {
    /// Router over an empty in-memory store.
    pub fn spawn() -> Self {
        Self::with_repository(Arc::new(InMemoryInvoiceRepository::new()))
    }

    /// Router over a store seeded with already-stored documents.
    pub fn with_documents(documents: Vec<Document>) -> Self {
        Self::with_repository(Arc::new(InMemoryInvoiceRepository::with_documents(
            documents,
        )))
    }

    /// Router over a MongoDB repository with no connection string.
    pub fn without_store() -> Self {
        let config = test_config(None);
        let db = MongoDb::new(None, config.mongodb.database.clone());
        Self::build(config, Arc::new(MongoInvoiceRepository::new(db)))
    }

    pub fn with_repository(invoices: Arc<dyn InvoiceRepository>) -> Self {
        Self::build(test_config(None), invoices)
    }

    fn build(config: InvoiceConfig, invoices: Arc<dyn InvoiceRepository>) -> Self {
        let auth: Arc<dyn AuthProvider> = Arc::new(StaticAdminAuth::from_config(&config.admin));
        let state = AppState {
            config,
            invoices: invoices.clone(),
            auth,
        };

        Self {
            router: build_router(state),
            invoices,
            cookie: None,
        }
    }

    /// Spawns and logs in as the admin.
    pub async fn logged_in() -> Self {
        let mut app = Self::spawn();
        app.login().await;
        app
    }

    pub async fn login(&mut self) {
        let response = self
            .post_json(
                "/login",
                json!({ "username": TEST_ADMIN_USERNAME, "password": TEST_ADMIN_PASSWORD }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {}", response.text());
    }

    pub async fn send(&mut self, builder: axum::http::request::Builder, body: Body) -> TestResponse {
        let builder = match &self.cookie {
            Some(cookie) => builder.header(header::COOKIE, cookie),
            None => builder,
        };
        let request = builder.body(body).expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router failed");

        if let Some(cookie) = session_cookie(response.headers()) {
            self.cookie = Some(cookie);
        }

        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        self.send(Request::builder().method(Method::GET).uri(uri), Body::empty())
            .await
    }

    pub async fn delete(&mut self, uri: &str) -> TestResponse {
        self.send(
            Request::builder().method(Method::DELETE).uri(uri),
            Body::empty(),
        )
        .await
    }

    pub async fn post_json(&mut self, uri: &str, body: Value) -> TestResponse {
        self.send_json(Method::POST, uri, body).await
    }

    pub async fn put_json(&mut self, uri: &str, body: Value) -> TestResponse {
        self.send_json(Method::PUT, uri, body).await
    }

    pub async fn send_json(&mut self, method: Method, uri: &str, body: Value) -> TestResponse {
        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json"),
            Body::from(body.to_string()),
        )
        .await
    }

    pub async fn post_form(&mut self, uri: &str, body: &'static str) -> TestResponse {
        self.send(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded"),
            Body::from(body),
        )
        .await
    }

    /// Posts text fields as `multipart/form-data`.
    pub async fn post_multipart(&mut self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        const BOUNDARY: &str = "invoice-test-boundary";

        let mut body = String::new();
        for (name, value) in fields {
            body.push_str(&format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            ));
        }
        body.push_str(&format!("--{}--\r\n", BOUNDARY));

        self.send(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                ),
            Body::from(body),
        )
        .await
    }

    /// Creates an invoice through the API and returns its id.
    pub async fn create_invoice(&mut self, body: Value) -> String {
        let response = self.post_json("/api/invoices", body).await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text());
        response.json()["data"]["_id"]
            .as_str()
            .expect("Created invoice has no id")
            .to_string()
    }
}

/// `name=value` of the session cookie set by a response, if any.
fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .find(|pair| pair.starts_with(&format!("{}=", SESSION_COOKIE_NAME)))
        .map(str::to_string)
}
