use invoice_service::config::InvoiceConfig;
use invoice_service::services::init_metrics;
use invoice_service::startup::Application;
use service_core::config::get_optional_env;
use service_core::error::AppError;
use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // LOG_LEVEL and OTLP_ENDPOINT may come from .env, so load it before tracing starts
    dotenvy::dotenv().ok();

    let log_level = get_optional_env("LOG_LEVEL").unwrap_or_else(|| "info".to_string());
    let otlp_endpoint = get_optional_env("OTLP_ENDPOINT");
    init_tracing("invoice-service", &log_level, otlp_endpoint.as_deref());

    // Initialize metrics recorder (must be before any metrics are recorded)
    init_metrics()?;

    let config = InvoiceConfig::load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;

    tracing::info!(
        service = "invoice-service",
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.common.environment,
        "Starting invoice service"
    );

    let application = Application::build(config).await?;
    application.run_until_stopped().await.map_err(|e| {
        tracing::error!("Server error: {}", e);
        AppError::from(e)
    })?;

    tracing::info!("Service shutdown complete");
    Ok(())
}
