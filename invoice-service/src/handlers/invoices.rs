use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Local;
use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use service_core::error::AppError;

use crate::dtos::body::InvoicePayload;
use crate::dtos::invoices::{ExportParams, InvoiceListParams};
use crate::dtos::query::QueryParams;
use crate::dtos::ApiResponse;
use crate::services::coercion::{prepare_insert, prepare_update};
use crate::services::export::{export_filename, render_csv, CSV_CONTENT_TYPE};
use crate::services::metrics::record_invoice_operation;
use crate::services::monthly::MonthlySummaryResponse;
use crate::services::{normalizer, InvoiceFilter};
use crate::startup::AppState;

const INVOICE_NOT_FOUND: &str = "Invoice not found";

/// Malformed ids cannot name a stored invoice, so they are reported as not found.
fn parse_invoice_id(raw: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(raw).map_err(|_| {
        tracing::debug!(invoice_id = %raw, "Malformed invoice id");
        AppError::not_found(INVOICE_NOT_FOUND)
    })
}

pub async fn list_invoices(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<InvoiceListParams>,
) -> Result<impl IntoResponse, AppError> {
    let filter = InvoiceFilter::for_listing(
        params.month.as_deref(),
        params.year.as_deref(),
        params.status.as_deref(),
        Local::now().date_naive(),
    );

    let invoices = state.invoices.find(&filter).await?;
    tracing::debug!(count = invoices.len(), "Listed invoices");

    Ok(Json(ApiResponse::data(normalizer::to_json_list(&invoices))))
}

pub async fn create_invoice(
    State(state): State<AppState>,
    InvoicePayload(payload): InvoicePayload,
) -> Result<impl IntoResponse, AppError> {
    let invoice = prepare_insert(payload, BsonDateTime::now());
    let id = state.invoices.insert(invoice).await?;

    let created = state.invoices.find_by_id(&id).await?.ok_or_else(|| {
        AppError::InternalError(anyhow::anyhow!("Invoice {} vanished after insert", id))
    })?;

    record_invoice_operation("create");
    tracing::info!(invoice_id = %id, "Invoice created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::data(normalizer::to_json(&created))),
    ))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_invoice_id(&invoice_id)?;

    let invoice = state
        .invoices
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found(INVOICE_NOT_FOUND))?;

    Ok(Json(ApiResponse::data(normalizer::to_json(&invoice))))
}

pub async fn update_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<String>,
    InvoicePayload(payload): InvoicePayload,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_invoice_id(&invoice_id)?;
    let changes = prepare_update(payload, BsonDateTime::now());

    if !state.invoices.update(&id, changes).await? {
        return Err(AppError::not_found("Invoice not found or no changes made"));
    }

    let updated = state
        .invoices
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found(INVOICE_NOT_FOUND))?;

    record_invoice_operation("update");
    tracing::info!(invoice_id = %id, "Invoice updated");

    Ok(Json(ApiResponse::data(normalizer::to_json(&updated))))
}

pub async fn delete_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_invoice_id(&invoice_id)?;

    if !state.invoices.delete(&id).await? {
        return Err(AppError::not_found(INVOICE_NOT_FOUND));
    }

    record_invoice_operation("delete");
    tracing::info!(invoice_id = %id, "Invoice deleted");

    Ok(Json(ApiResponse::message("Invoice deleted successfully")))
}

pub async fn monthly_summary(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let summaries = state.invoices.monthly_summary().await?;
    let data: Vec<MonthlySummaryResponse> =
        summaries.iter().map(MonthlySummaryResponse::from).collect();

    Ok(Json(ApiResponse::data(data)))
}

pub async fn export_csv(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<ExportParams>,
) -> Result<impl IntoResponse, AppError> {
    let filter = InvoiceFilter::for_export(params.month.as_deref(), params.year.as_deref());
    let invoices = state.invoices.find(&filter).await?;

    let body = render_csv(&invoices, &Local)?;
    let filename = export_filename(Local::now().naive_local());

    record_invoice_operation("export");
    tracing::info!(count = invoices.len(), filename = %filename, "Exported invoices as CSV");

    Ok((
        [
            (header::CONTENT_TYPE, CSV_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", filename),
            ),
        ],
        body,
    ))
}
