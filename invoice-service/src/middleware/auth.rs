use axum::{
    body::Body,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use service_core::error::AppError;
use tower_sessions::Session;

pub const LOGGED_IN_KEY: &str = "logged_in";
pub const USERNAME_KEY: &str = "username";

pub const LOGIN_PATH: &str = "/login";

/// Whether the session carries the admin flag. Session store errors count as logged out.
pub async fn is_logged_in(session: &Session) -> bool {
    match session.get::<bool>(LOGGED_IN_KEY).await {
        Ok(flag) => flag.unwrap_or(false),
        Err(e) => {
            tracing::warn!("Failed to read session: {}", e);
            false
        }
    }
}

/// Page routes: anonymous visitors are sent to the login page.
pub async fn require_login_page(session: Session, request: Request<Body>, next: Next) -> Response {
    if !is_logged_in(&session).await {
        return Redirect::to(LOGIN_PATH).into_response();
    }

    next.run(request).await
}

/// API routes: anonymous callers get a 401 error body.
pub async fn require_login_api(
    session: Session,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    if !is_logged_in(&session).await {
        tracing::debug!(path = %request.uri().path(), "Rejected unauthenticated API call");
        return Err(AppError::unauthorized("Authentication required"));
    }

    Ok(next.run(request).await)
}
