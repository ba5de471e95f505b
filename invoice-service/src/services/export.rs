//! CSV rendering of invoice listings.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use std::fmt::Display;
use mongodb::bson::{Bson, Document};
use service_core::error::AppError;

use crate::models::invoice::{
    AMOUNT, CLIENT_NAME, CLIENT_NAME_ALIAS, CREATED_AT, DATE, DESCRIPTION, INVOICE_NUMBER,
    INVOICE_NUMBER_ALIAS, PAYMENT_DUE_DATE, STATUS, UPDATED_AT,
};
use crate::services::coercion::{is_truthy, DATE_FORMAT};
use crate::services::normalizer::iso_timestamp;

pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

pub const HEADER: [&str; 9] = [
    "Invoice Number",
    "Client Name",
    "Amount",
    "Invoice Date",
    "Payment Due Date",
    "Status",
    "Description",
    "Created At",
    "Updated At",
];

const CSV_DATE_FORMAT: &str = "%d-%m-%Y";
const CSV_TIMESTAMP_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

/// `invoices_export_<YYYYMMDD_HHMMSS>.csv` for the given export time.
pub fn export_filename(exported_at: NaiveDateTime) -> String {
    format!("invoices_export_{}.csv", exported_at.format("%Y%m%d_%H%M%S"))
}

/// Renders the header row followed by one row per invoice, in input order.
///
/// Stored `created_at`/`updated_at` instants are written as wall-clock time
/// in `tz`, the zone the export filename is stamped in. Invoice and due
/// dates are calendar days and are written as stored.
pub fn render_csv<Tz>(invoices: &[Document], tz: &Tz) -> Result<Vec<u8>, AppError>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());

    writer.write_record(HEADER).map_err(csv_error)?;
    for invoice in invoices {
        writer.write_record(row(invoice, tz)).map_err(csv_error)?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Failed to finish CSV: {}", e)))
}

fn csv_error(err: csv::Error) -> AppError {
    AppError::InternalError(anyhow::anyhow!("Failed to write CSV: {}", err))
}

pub fn row<Tz>(invoice: &Document, tz: &Tz) -> [String; 9]
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    [
        with_alias(invoice, INVOICE_NUMBER, INVOICE_NUMBER_ALIAS),
        with_alias(invoice, CLIENT_NAME, CLIENT_NAME_ALIAS),
        invoice
            .get(AMOUNT)
            .map(cell_text)
            .unwrap_or_else(|| "0".to_string()),
        date_cell(invoice.get(DATE)),
        date_cell(invoice.get(PAYMENT_DUE_DATE)),
        invoice.get(STATUS).map(cell_text).unwrap_or_default(),
        invoice.get(DESCRIPTION).map(cell_text).unwrap_or_default(),
        timestamp_cell(invoice.get(CREATED_AT), tz),
        timestamp_cell(invoice.get(UPDATED_AT), tz),
    ]
}

/// The snake_case field when present (even if empty), else the camelCase alias.
fn with_alias(invoice: &Document, key: &str, alias: &str) -> String {
    invoice
        .get(key)
        .or_else(|| invoice.get(alias))
        .map(cell_text)
        .unwrap_or_default()
}

fn date_cell(value: Option<&Bson>) -> String {
    match value {
        Some(v) if is_truthy(v) => match v {
            Bson::DateTime(dt) => dt.to_chrono().format(CSV_DATE_FORMAT).to_string(),
            other => {
                let raw = cell_text(other);
                NaiveDate::parse_from_str(&raw, DATE_FORMAT)
                    .map(|d| d.format(CSV_DATE_FORMAT).to_string())
                    .unwrap_or(raw)
            }
        },
        _ => String::new(),
    }
}

fn timestamp_cell<Tz>(value: Option<&Bson>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match value {
        Some(v) if is_truthy(v) => match v {
            Bson::DateTime(dt) => dt
                .to_chrono()
                .with_timezone(tz)
                .format(CSV_TIMESTAMP_FORMAT)
                .to_string(),
            other => {
                let raw = cell_text(other);
                parse_iso_timestamp(&raw)
                    .map(|ts| ts.format(CSV_TIMESTAMP_FORMAT).to_string())
                    .unwrap_or(raw)
            }
        },
        _ => String::new(),
    }
}

/// ISO-8601 text to its wall-clock time. Offsets (including a trailing `Z`)
/// are accepted but not converted; a bare date means midnight.
fn parse_iso_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%:z"] {
        if let Ok(ts) = DateTime::parse_from_str(raw, format) {
            return Some(ts.naive_local());
        }
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Plain-text form of a stored value for a CSV cell.
pub fn cell_text(value: &Bson) -> String {
    match value {
        Bson::String(s) => s.clone(),
        Bson::Double(v) => float_text(*v),
        Bson::Int32(v) => v.to_string(),
        Bson::Int64(v) => v.to_string(),
        Bson::Boolean(true) => "True".to_string(),
        Bson::Boolean(false) => "False".to_string(),
        Bson::Null | Bson::Undefined => String::new(),
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::DateTime(dt) => iso_timestamp(dt),
        other => other.clone().into_relaxed_extjson().to_string(),
    }
}

/// Whole numbers keep one decimal place (`500.0`), like the admin client shows them.
fn float_text(v: f64) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "inf" } else { "-inf" }.to_string()
    } else if v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{:.1}", v)
    } else {
        v.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::filter::midnight_utc;
    use chrono::{FixedOffset, Utc};
    use mongodb::bson::{doc, DateTime as BsonDateTime};

    fn lines(bytes: &[u8]) -> Vec<String> {
        String::from_utf8(bytes.to_vec())
            .unwrap()
            .split("\r\n")
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_empty_export_is_header_only() {
        let out = render_csv(&[], &Utc).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Invoice Number,Client Name,Amount,Invoice Date,Payment Due Date,Status,Description,Created At,Updated At\r\n"
        );
    }

    #[test]
    fn test_invoice_date_is_day_month_year() {
        let date = midnight_utc(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        let cells = row(&doc! { "date": date }, &Utc);
        assert_eq!(cells[3], "05-03-2024");
    }

    #[test]
    fn test_full_row() {
        let created = BsonDateTime::from_chrono(Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap());
        let invoice = doc! {
            "invoice_number": "INV-001",
            "client_name": "Acme, Inc.",
            "amount": 500.0,
            "date": midnight_utc(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()),
            "payment_due_date": midnight_utc(NaiveDate::from_ymd_opt(2024, 4, 4).unwrap()),
            "status": "pending",
            "description": "Consulting",
            "created_at": created,
            "updated_at": created,
        };

        let out = render_csv(&[invoice], &Utc).unwrap();
        let rows = lines(&out);

        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[1],
            "INV-001,\"Acme, Inc.\",500.0,05-03-2024,04-04-2024,pending,Consulting,05-03-2024 14:07:09,05-03-2024 14:07:09"
        );
    }

    #[test]
    fn test_aliases_and_defaults() {
        let cells = row(&doc! { "invoiceNumber": "N-9", "clientName": "Globex" }, &Utc);
        assert_eq!(cells[0], "N-9");
        assert_eq!(cells[1], "Globex");
        assert_eq!(cells[2], "0");
        assert_eq!(cells[3], "");
        assert_eq!(cells[5], "");
        assert_eq!(cells[7], "");

        let snake_wins = row(&doc! { "client_name": "", "clientName": "Globex" }, &Utc);
        assert_eq!(snake_wins[1], "");
    }

    #[test]
    fn test_string_dates_are_reformatted_or_kept() {
        let cells = row(&doc! {
            "date": "2024-03-05",
            "payment_due_date": "next week",
            "created_at": "2024-03-05T10:11:12Z",
            "updated_at": "2024-03-05T10:11:12.5+02:00",
        }, &Utc);

        assert_eq!(cells[3], "05-03-2024");
        assert_eq!(cells[4], "next week");
        assert_eq!(cells[7], "05-03-2024 10:11:12");
        assert_eq!(cells[8], "05-03-2024 10:11:12");
    }

    #[test]
    fn test_unparsable_timestamp_kept_raw() {
        let cells = row(&doc! { "created_at": "yesterday" }, &Utc);
        assert_eq!(cells[7], "yesterday");
    }

    #[test]
    fn test_amount_text() {
        assert_eq!(row(&doc! { "amount": 123.45 }, &Utc)[2], "123.45");
        assert_eq!(row(&doc! { "amount": 7_i32 }, &Utc)[2], "7");
        assert_eq!(row(&doc! { "amount": "12" }, &Utc)[2], "12");
    }

    #[test]
    fn test_stored_timestamps_use_export_zone() {
        let created = BsonDateTime::from_chrono(Utc.with_ymd_and_hms(2024, 3, 5, 23, 30, 0).unwrap());
        let invoice = doc! {
            "date": midnight_utc(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()),
            "created_at": created,
            "updated_at": created,
        };
        let ahead = FixedOffset::east_opt(2 * 3600).unwrap();

        let cells = row(&invoice, &ahead);

        assert_eq!(cells[3], "05-03-2024");
        assert_eq!(cells[7], "06-03-2024 01:30:00");
        assert_eq!(cells[8], "06-03-2024 01:30:00");
    }

    #[test]
    fn test_filename_uses_export_time() {
        let at = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(9, 8, 7)
            .unwrap();
        assert_eq!(export_filename(at), "invoices_export_20240305_090807.csv");
    }
}
