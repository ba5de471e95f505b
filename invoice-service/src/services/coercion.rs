//! Lenient normalization of inbound invoice payloads.
//!
//! Malformed values never fail a request. On creation they fall back to a
//! default (`amount` → 0.0, `date` → now); on update the field is left out
//! of the change set so the stored value survives. `payment_due_date` is
//! dropped whenever it does not parse. Fields the service does not know
//! about are kept exactly as sent.

use chrono::NaiveDate;
use mongodb::bson::{Bson, DateTime as BsonDateTime, Document};

use crate::models::invoice::{AMOUNT, CREATED_AT, DATE, ID, PAYMENT_DUE_DATE, UPDATED_AT};
use crate::services::filter::midnight_utc;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Builds the document to insert for a new invoice.
pub fn prepare_insert(mut payload: Document, now: BsonDateTime) -> Document {
    payload.remove(ID);

    if let Some(raw) = payload.get(AMOUNT) {
        let amount = parse_amount(raw).unwrap_or(0.0);
        payload.insert(AMOUNT, amount);
    }

    let date = payload
        .get(DATE)
        .filter(|v| is_truthy(v))
        .and_then(parse_calendar_date)
        .unwrap_or(now);
    payload.insert(DATE, date);

    coerce_optional_date(&mut payload, PAYMENT_DUE_DATE);

    payload.insert(CREATED_AT, now);
    payload.insert(UPDATED_AT, now);
    payload
}

/// Builds the `$set` change set for a partial update.
pub fn prepare_update(mut payload: Document, now: BsonDateTime) -> Document {
    payload.remove(ID);
    payload.remove(CREATED_AT);

    if let Some(raw) = payload.get(AMOUNT) {
        match parse_amount(raw) {
            Some(amount) => {
                payload.insert(AMOUNT, amount);
            }
            None => {
                payload.remove(AMOUNT);
            }
        }
    }

    coerce_optional_date(&mut payload, DATE);
    coerce_optional_date(&mut payload, PAYMENT_DUE_DATE);

    payload.insert(UPDATED_AT, now);
    payload
}

/// Replaces a non-empty date string with a stored date, or removes the
/// field when it does not parse. Empty values are left untouched.
fn coerce_optional_date(payload: &mut Document, key: &str) {
    let Some(raw) = payload.get(key) else {
        return;
    };
    if !is_truthy(raw) {
        return;
    }

    match parse_calendar_date(raw) {
        Some(date) => {
            payload.insert(key, date);
        }
        None => {
            tracing::debug!(field = key, "Dropping unparsable date");
            payload.remove(key);
        }
    }
}

/// Numbers, numeric strings (surrounding whitespace allowed) and booleans.
pub fn parse_amount(value: &Bson) -> Option<f64> {
    match value {
        Bson::Double(v) => Some(*v),
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Boolean(v) => Some(if *v { 1.0 } else { 0.0 }),
        Bson::String(s) => strip_digit_separators(s.trim())?.parse::<f64>().ok(),
        _ => None,
    }
}

/// Removes `_` digit separators (`1_000.5`). An underscore anywhere but
/// between two digits makes the text unparsable.
fn strip_digit_separators(text: &str) -> Option<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());

    for (i, &c) in chars.iter().enumerate() {
        if c != '_' {
            out.push(c);
            continue;
        }
        let between_digits = i > 0
            && chars[i - 1].is_ascii_digit()
            && chars.get(i + 1).is_some_and(|next| next.is_ascii_digit());
        if !between_digits {
            return None;
        }
    }
    Some(out)
}

/// `YYYY-MM-DD` strings become midnight UTC of that day.
pub fn parse_calendar_date(value: &Bson) -> Option<BsonDateTime> {
    match value {
        Bson::String(s) => NaiveDate::parse_from_str(s, DATE_FORMAT)
            .ok()
            .map(midnight_utc),
        _ => None,
    }
}

/// Whether a value counts as "present" for the date guards: empty strings,
/// null, false, zero and empty containers do not.
pub fn is_truthy(value: &Bson) -> bool {
    match value {
        Bson::Null | Bson::Undefined => false,
        Bson::String(s) => !s.is_empty(),
        Bson::Boolean(b) => *b,
        Bson::Int32(v) => *v != 0,
        Bson::Int64(v) => *v != 0,
        Bson::Double(v) => *v != 0.0,
        Bson::Array(items) => !items.is_empty(),
        Bson::Document(doc) => !doc.is_empty(),
        _ => true,
    }
}
