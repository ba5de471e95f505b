use askama::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect},
    Json,
};
use serde_json::json;
use tower_sessions::Session;

use crate::middleware::auth::USERNAME_KEY;
use crate::services::get_metrics;
use crate::startup::AppState;

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub username: String,
}

pub async fn index(session: Session) -> impl IntoResponse {
    let username = session
        .get::<String>(USERNAME_KEY)
        .await
        .ok()
        .flatten()
        .unwrap_or_default();

    IndexTemplate { username }
}

pub async fn favicon_ico() -> Redirect {
    Redirect::to("/static/favicon.ico")
}

pub async fn favicon_png() -> Redirect {
    Redirect::to("/static/favicon.png")
}

pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "invoice-service",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.invoices.ping().await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

pub async fn metrics_endpoint() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}
