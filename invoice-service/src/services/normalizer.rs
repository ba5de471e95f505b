//! Converts store-native values into transport-safe forms.
//!
//! Object ids become their hex string and timestamps become RFC 3339
//! strings (UTC, `Z` suffix). Nested documents and arrays are walked to any
//! depth; every other value is returned unchanged. Inputs are borrowed and
//! never modified, and applying the conversion twice gives the same result
//! as applying it once.

use chrono::SecondsFormat;
use mongodb::bson::{Bson, DateTime as BsonDateTime, Document};
use serde_json::Value;

pub fn normalize_value(value: &Bson) -> Bson {
    match value {
        Bson::ObjectId(oid) => Bson::String(oid.to_hex()),
        Bson::DateTime(dt) => Bson::String(iso_timestamp(dt)),
        Bson::Document(doc) => Bson::Document(normalize_document(doc)),
        Bson::Array(items) => Bson::Array(items.iter().map(normalize_value).collect()),
        other => other.clone(),
    }
}

pub fn normalize_document(doc: &Document) -> Document {
    doc.iter()
        .map(|(key, value)| (key.clone(), normalize_value(value)))
        .collect()
}

/// Normalizes a document and renders it as plain JSON for a response body.
pub fn to_json(doc: &Document) -> Value {
    Bson::Document(normalize_document(doc)).into_relaxed_extjson()
}

pub fn to_json_list(docs: &[Document]) -> Vec<Value> {
    docs.iter().map(to_json).collect()
}

pub fn iso_timestamp(dt: &BsonDateTime) -> String {
    dt.to_chrono().to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
