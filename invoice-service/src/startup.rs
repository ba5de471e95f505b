use axum::{
    body::Body,
    http::Request,
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware,
    security_headers::security_headers_middleware,
    tracing::{make_request_span, request_id_middleware},
};
use sha2::{Digest, Sha512};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tower_sessions::{cookie::Key, cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};

use crate::config::InvoiceConfig;
use crate::handlers;
use crate::middleware::{require_db, require_login_api, require_login_page};
use crate::services::{
    AuthProvider, InvoiceRepository, MongoDb, MongoInvoiceRepository, StaticAdminAuth,
};

pub const SESSION_COOKIE_NAME: &str = "invoice_session";

#[derive(Clone)]
pub struct AppState {
    pub config: InvoiceConfig,
    pub invoices: Arc<dyn InvoiceRepository>,
    pub auth: Arc<dyn AuthProvider>,
}

impl AppState {
    /// Production wiring: MongoDB-backed invoices and the configured admin pair.
    pub fn from_config(config: InvoiceConfig) -> Self {
        let db = MongoDb::new(config.mongodb.uri.clone(), config.mongodb.database.clone());
        let invoices: Arc<dyn InvoiceRepository> = Arc::new(MongoInvoiceRepository::new(db));
        let auth: Arc<dyn AuthProvider> = Arc::new(StaticAdminAuth::from_config(&config.admin));

        Self {
            config,
            invoices,
            auth,
        }
    }
}

/// Cookie signing key: SHA-512 of the configured secret (always 64 bytes).
fn session_key(config: &InvoiceConfig) -> Key {
    let digest = Sha512::digest(config.session.secret.expose_secret().as_bytes());
    Key::from(digest.as_slice())
}

pub fn build_router(state: AppState) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_secure(state.config.session.secure_cookie)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(Duration::hours(24)))
        .with_signed(session_key(&state.config));

    // Outermost route_layer runs first: login, then the store check.
    let api_routes = Router::new()
        .route(
            "/api/invoices",
            get(handlers::list_invoices).post(handlers::create_invoice),
        )
        .route("/api/invoices/monthly", get(handlers::monthly_summary))
        .route("/api/invoices/export/csv", get(handlers::export_csv))
        .route(
            "/api/invoices/:invoice_id",
            get(handlers::get_invoice)
                .put(handlers::update_invoice)
                .delete(handlers::delete_invoice),
        )
        .route_layer(from_fn_with_state(state.clone(), require_db))
        .route_layer(from_fn(require_login_api));

    let page_routes = Router::new()
        .route("/", get(handlers::index))
        .route_layer(from_fn(require_login_page));

    Router::new()
        .route(
            "/login",
            get(handlers::login_page).post(handlers::login_handler),
        )
        .route("/logout", get(handlers::logout_handler))
        .route("/favicon.ico", get(handlers::favicon_ico))
        .route("/favicon.png", get(handlers::favicon_png))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .merge(api_routes)
        .merge(page_routes)
        .nest_service("/static", ServeDir::new(&state.config.static_dir))
        .layer(session_layer)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| make_request_span(request)),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
}

impl Application {
    pub async fn build(config: InvoiceConfig) -> Result<Self, AppError> {
        Self::build_with_state(AppState::from_config(config)).await
    }

    pub async fn build_with_state(state: AppState) -> Result<Self, AppError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], state.config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(
            port,
            store_configured = state.config.mongodb.uri.is_some(),
            "Listening"
        );

        let app = build_router(state);
        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
