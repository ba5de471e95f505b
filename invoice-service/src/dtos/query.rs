use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use serde::de::DeserializeOwned;
use serde_json::Value;
use service_core::error::AppError;

use super::first_values;

/// Query string extractor that never fails a request.
///
/// The first of repeated keys wins. A query that cannot be decoded into `T`
/// is treated as empty, so the filters it carried are simply dropped.
#[derive(Debug)]
pub struct QueryParams<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Default,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let query = parts.uri.query().unwrap_or_default();
        Ok(QueryParams(decode(query)))
    }
}

fn decode<T: DeserializeOwned + Default>(query: &str) -> T {
    let decoded = serde_urlencoded::from_str::<Vec<(String, String)>>(query)
        .map_err(|e| e.to_string())
        .and_then(|pairs| {
            serde_json::from_value(Value::Object(first_values(pairs))).map_err(|e| e.to_string())
        });

    decoded.unwrap_or_else(|error| {
        tracing::debug!(%error, query, "Ignoring unreadable query string");
        T::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtos::invoices::{ExportParams, InvoiceListParams};

    #[test]
    fn test_first_repeated_key_wins() {
        let params: InvoiceListParams = decode("month=1&month=2&year=2024&status=paid&status=");

        assert_eq!(params.month.as_deref(), Some("1"));
        assert_eq!(params.year.as_deref(), Some("2024"));
        assert_eq!(params.status.as_deref(), Some("paid"));
    }

    #[test]
    fn test_unknown_and_empty_values_pass_through() {
        let params: ExportParams = decode("month=&year=abc&page=3");

        assert_eq!(params.month.as_deref(), Some(""));
        assert_eq!(params.year.as_deref(), Some("abc"));
    }

    #[test]
    fn test_empty_query_is_default() {
        let params: InvoiceListParams = decode("");
        assert!(params.month.is_none() && params.year.is_none() && params.status.is_none());
    }
}
