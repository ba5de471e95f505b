use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use crate::startup::AppState;

/// Refuses data routes with the store-unavailable error until the store
/// answers. Each call retries a failed connection.
pub async fn require_db(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    if let Err(e) = state.invoices.ensure_ready().await {
        tracing::warn!(path = %request.uri().path(), "Invoice store unavailable: {}", e);
        return Err(AppError::store_unavailable());
    }

    Ok(next.run(request).await)
}
