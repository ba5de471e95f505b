//! Request bodies that may arrive as JSON or as a submitted form.
//!
//! A body is read as JSON when its media type mentions `json`. Url-encoded
//! and `multipart/form-data` bodies (or bodies with no `Content-Type`) are
//! read as form fields, where the first of repeated keys wins and uploaded
//! files are ignored. Anything else, or an unreadable body, is rejected
//! with 400.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::{header::CONTENT_TYPE, HeaderMap},
};
use mongodb::bson::{self, Document};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use service_core::error::AppError;

use super::first_values;

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
const MULTIPART_FORM: &str = "multipart/form-data";

#[derive(Debug, PartialEq, Eq)]
enum BodyKind {
    Json,
    Form,
    Multipart,
    Unsupported(String),
}

fn body_kind(headers: &HeaderMap) -> BodyKind {
    let Some(content_type) = headers.get(CONTENT_TYPE) else {
        return BodyKind::Form;
    };
    let content_type = content_type.to_str().unwrap_or_default();
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if media_type.contains("json") {
        BodyKind::Json
    } else if media_type.is_empty() || media_type == FORM_URLENCODED {
        BodyKind::Form
    } else if media_type == MULTIPART_FORM {
        BodyKind::Multipart
    } else {
        BodyKind::Unsupported(content_type.to_string())
    }
}

enum RawBody {
    Json(Bytes),
    Fields(Map<String, Value>),
}

async fn read_body<S: Send + Sync>(req: Request, state: &S) -> Result<RawBody, AppError> {
    match body_kind(req.headers()) {
        BodyKind::Json => Ok(RawBody::Json(read_bytes(req, state).await?)),
        BodyKind::Form => {
            let bytes = read_bytes(req, state).await?;
            let pairs: Vec<(String, String)> =
                serde_urlencoded::from_bytes(&bytes).map_err(bad_body)?;
            Ok(RawBody::Fields(first_values(pairs)))
        }
        BodyKind::Multipart => {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(bad_body)?;
            Ok(RawBody::Fields(multipart_fields(multipart).await?))
        }
        BodyKind::Unsupported(content_type) => Err(bad_body(format!(
            "unsupported content type {}",
            content_type
        ))),
    }
}

async fn read_bytes<S: Send + Sync>(req: Request, state: &S) -> Result<Bytes, AppError> {
    Bytes::from_request(req, state)
        .await
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Failed to read request body: {}", e)))
}

async fn multipart_fields(mut multipart: Multipart) -> Result<Map<String, Value>, AppError> {
    let mut pairs = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(bad_body)? {
        if field.file_name().is_some() {
            continue;
        }
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let text = field.text().await.map_err(bad_body)?;
        pairs.push((name, text));
    }

    Ok(first_values(pairs))
}

fn bad_body(err: impl std::fmt::Display) -> AppError {
    AppError::BadRequest(anyhow::anyhow!("Invalid request body: {}", err))
}

/// Typed body decoded from JSON or form data.
pub struct JsonOrForm<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonOrForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let value = match read_body(req, state).await? {
            RawBody::Json(bytes) => serde_json::from_slice(&bytes).map_err(bad_body)?,
            RawBody::Fields(fields) => {
                serde_json::from_value(Value::Object(fields)).map_err(bad_body)?
            }
        };
        Ok(JsonOrForm(value))
    }
}

/// Free-form invoice fields as a BSON document.
///
/// JSON must be an object (`null` counts as empty); form fields arrive as strings.
#[derive(Debug)]
pub struct InvoicePayload(pub Document);

#[async_trait]
impl<S> FromRequest<S> for InvoicePayload
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let fields: Map<String, Value> = match read_body(req, state).await? {
            RawBody::Json(bytes) => match serde_json::from_slice(&bytes).map_err(bad_body)? {
                Value::Null => Map::new(),
                Value::Object(fields) => fields,
                _ => return Err(bad_body("expected a JSON object")),
            },
            RawBody::Fields(fields) => fields,
        };

        let document = bson::to_document(&fields).map_err(bad_body)?;
        Ok(InvoicePayload(document))
    }
}
