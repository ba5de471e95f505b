//! Invoice model for invoice-service.
//!
//! Invoices are stored schemaless: any field a caller sends is persisted as
//! is. The constants below name the fields the service itself reads or
//! writes, and [`Invoice`] gives typed read access to them.

use mongodb::bson::{oid::ObjectId, Bson, DateTime as BsonDateTime, Document};

pub const ID: &str = "_id";
pub const INVOICE_NUMBER: &str = "invoice_number";
pub const INVOICE_NUMBER_ALIAS: &str = "invoiceNumber";
pub const CLIENT_NAME: &str = "client_name";
pub const CLIENT_NAME_ALIAS: &str = "clientName";
pub const AMOUNT: &str = "amount";
pub const DATE: &str = "date";
pub const PAYMENT_DUE_DATE: &str = "payment_due_date";
pub const STATUS: &str = "status";
pub const DESCRIPTION: &str = "description";
pub const CREATED_AT: &str = "created_at";
pub const UPDATED_AT: &str = "updated_at";

/// Stored status value that excludes an invoice from the overdue view.
pub const STATUS_PAID: &str = "paid";

/// Borrowed, read-only view over a stored invoice document.
#[derive(Debug, Clone, Copy)]
pub struct Invoice<'a>(pub &'a Document);

impl<'a> Invoice<'a> {
    pub fn id(&self) -> Option<ObjectId> {
        self.0.get_object_id(ID).ok()
    }

    /// Numeric amount, whatever numeric BSON type it was stored as.
    pub fn amount(&self) -> Option<f64> {
        self.0.get(AMOUNT).and_then(bson_as_f64)
    }

    pub fn date(&self) -> Option<BsonDateTime> {
        self.datetime(DATE)
    }

    pub fn payment_due_date(&self) -> Option<BsonDateTime> {
        self.datetime(PAYMENT_DUE_DATE)
    }

    pub fn created_at(&self) -> Option<BsonDateTime> {
        self.datetime(CREATED_AT)
    }

    pub fn status(&self) -> Option<&'a str> {
        self.0.get_str(STATUS).ok()
    }

    fn datetime(&self, key: &str) -> Option<BsonDateTime> {
        self.0.get_datetime(key).ok().copied()
    }
}

/// Numeric BSON values as `f64`; anything else is not a number.
pub fn bson_as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Double(v) => Some(*v),
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        _ => None,
    }
}
