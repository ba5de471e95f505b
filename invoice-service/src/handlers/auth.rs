use askama::Template;
use axum::{
    extract::State,
    response::{IntoResponse, Redirect},
    Json,
};
use service_core::error::AppError;
use tower_sessions::Session;

use crate::dtos::auth::LoginRequest;
use crate::dtos::body::JsonOrForm;
use crate::dtos::ApiResponse;
use crate::middleware::auth::{LOGGED_IN_KEY, LOGIN_PATH, USERNAME_KEY};
use crate::services::metrics::record_login;
use crate::startup::AppState;

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {}

fn session_error(err: tower_sessions::session::Error) -> AppError {
    AppError::InternalError(anyhow::anyhow!("Session store error: {}", err))
}

pub async fn login_page() -> impl IntoResponse {
    LoginTemplate {}
}

pub async fn login_handler(
    State(state): State<AppState>,
    session: Session,
    JsonOrForm(payload): JsonOrForm<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let username = match payload.credentials() {
        Some((username, password)) if state.auth.verify(username, password) => {
            username.to_string()
        }
        attempted => {
            record_login(false);
            tracing::warn!(
                username = attempted.map(|(username, _)| username).unwrap_or_default(),
                "Admin login rejected"
            );
            return Err(AppError::unauthorized("Invalid username or password"));
        }
    };

    // New session id on privilege change
    session.cycle_id().await.map_err(session_error)?;
    session
        .insert(LOGGED_IN_KEY, true)
        .await
        .map_err(session_error)?;
    session
        .insert(USERNAME_KEY, &username)
        .await
        .map_err(session_error)?;

    record_login(true);
    tracing::info!(username = %username, "Admin logged in");

    Ok(Json(ApiResponse::message("Login successful")))
}

pub async fn logout_handler(session: Session) -> impl IntoResponse {
    if let Err(e) = session.flush().await {
        tracing::error!("Failed to clear session during logout: {}", e);
    } else {
        tracing::info!("Admin logged out");
    }

    Redirect::to(LOGIN_PATH)
}
