//! Translates list/export query parameters into an invoice predicate.
//!
//! The same [`InvoiceFilter`] renders as a MongoDB query document
//! ([`InvoiceFilter::to_document`]) and evaluates directly against a stored
//! document ([`InvoiceFilter::matches`]) with the store's comparison rules:
//! range and `$lt` comparisons only ever match stored date values.

use chrono::{Datelike, NaiveDate, NaiveTime};
use mongodb::bson::{doc, Bson, DateTime as BsonDateTime, Document};

use crate::models::invoice::{self, Invoice};

/// Half-open `[start, end)` range covering one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl MonthRange {
    /// `None` when `month` is outside 1..=12 or `year` outside 1..=9999.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if !(1..=9999).contains(&year) {
            return None;
        }
        let start = NaiveDate::from_ymd_opt(year, month, 1)?;
        let end = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        Some(Self { start, end })
    }

    /// Parses raw query values. Both must be present and non-empty; any
    /// parse failure yields `None` so the caller silently drops the range.
    pub fn parse(month: Option<&str>, year: Option<&str>) -> Option<Self> {
        let month = month.filter(|m| !m.is_empty())?;
        let year = year.filter(|y| !y.is_empty())?;
        let month: u32 = month.trim().parse().ok()?;
        let year: i32 = year.trim().parse().ok()?;
        Self::new(year, month)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn start_bson(&self) -> BsonDateTime {
        midnight_utc(self.start)
    }

    pub fn end_bson(&self) -> BsonDateTime {
        midnight_utc(self.end)
    }

    pub fn contains(&self, value: BsonDateTime) -> bool {
        value >= self.start_bson() && value < self.end_bson()
    }

    fn bounds(&self) -> Document {
        doc! { "$gte": self.start_bson(), "$lt": self.end_bson() }
    }
}

/// Which timestamps decide whether an invoice falls in a month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateAxis {
    /// `date` in range, or `created_at` in range when `date` is absent.
    InvoiceDateWithCreatedFallback,
    /// `date` in range or `created_at` in range.
    InvoiceDateOrCreated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusFilter {
    /// Due before `today` and not paid. Never a stored value.
    Overdue { today: NaiveDate },
    Exact(String),
}

impl StatusFilter {
    pub const OVERDUE: &'static str = "overdue";

    /// Empty or missing status means no status constraint.
    pub fn parse(status: Option<&str>, today: NaiveDate) -> Option<Self> {
        match status {
            None | Some("") => None,
            Some(Self::OVERDUE) => Some(StatusFilter::Overdue { today }),
            Some(other) => Some(StatusFilter::Exact(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvoiceFilter {
    pub period: Option<(MonthRange, DateAxis)>,
    pub status: Option<StatusFilter>,
}

impl InvoiceFilter {
    /// Matches every invoice.
    pub fn all() -> Self {
        Self::default()
    }

    /// Filter for `GET /api/invoices`.
    pub fn for_listing(
        month: Option<&str>,
        year: Option<&str>,
        status: Option<&str>,
        today: NaiveDate,
    ) -> Self {
        Self {
            period: MonthRange::parse(month, year)
                .map(|range| (range, DateAxis::InvoiceDateWithCreatedFallback)),
            status: StatusFilter::parse(status, today),
        }
    }

    /// Filter for the CSV export: month only, no status constraint.
    pub fn for_export(month: Option<&str>, year: Option<&str>) -> Self {
        Self {
            period: MonthRange::parse(month, year)
                .map(|range| (range, DateAxis::InvoiceDateOrCreated)),
            status: None,
        }
    }

    pub fn to_document(&self) -> Document {
        let mut fragments = Vec::new();

        if let Some((range, axis)) = &self.period {
            fragments.push(period_fragment(range, *axis));
        }

        if let Some(status) = &self.status {
            fragments.push(status_fragment(status));
        }

        match fragments.len() {
            0 => Document::new(),
            1 => fragments.remove(0),
            _ => doc! {
                "$and": fragments.into_iter().map(Bson::Document).collect::<Vec<_>>()
            },
        }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        let view = Invoice(doc);

        let in_period = match &self.period {
            None => true,
            Some((range, DateAxis::InvoiceDateWithCreatedFallback)) => {
                view.date().is_some_and(|d| range.contains(d))
                    || (!doc.contains_key(invoice::DATE)
                        && view.created_at().is_some_and(|d| range.contains(d)))
            }
            Some((range, DateAxis::InvoiceDateOrCreated)) => {
                view.date().is_some_and(|d| range.contains(d))
                    || view.created_at().is_some_and(|d| range.contains(d))
            }
        };

        let status_ok = match &self.status {
            None => true,
            Some(StatusFilter::Overdue { today }) => {
                view
                    .payment_due_date()
                    .is_some_and(|due| due < midnight_utc(*today))
                    && view.status() != Some(invoice::STATUS_PAID)
            }
            Some(StatusFilter::Exact(expected)) => view.status() == Some(expected.as_str()),
        };

        in_period && status_ok
    }
}

fn period_fragment(range: &MonthRange, axis: DateAxis) -> Document {
    match axis {
        DateAxis::InvoiceDateWithCreatedFallback => doc! {
            "$or": [
                { "date": range.bounds() },
                {
                    "$and": [
                        { "date": { "$exists": false } },
                        { "created_at": range.bounds() },
                    ]
                },
            ]
        },
        DateAxis::InvoiceDateOrCreated => doc! {
            "$or": [
                { "date": range.bounds() },
                { "created_at": range.bounds() },
            ]
        },
    }
}

fn status_fragment(status: &StatusFilter) -> Document {
    match status {
        StatusFilter::Overdue { today } => doc! {
            "payment_due_date": { "$lt": midnight_utc(*today) },
            "status": { "$ne": invoice::STATUS_PAID },
        },
        StatusFilter::Exact(value) => doc! { "status": value.as_str() },
    }
}

/// Calendar dates are stored as midnight UTC of that date.
pub fn midnight_utc(date: NaiveDate) -> BsonDateTime {
    BsonDateTime::from_chrono(date.and_time(NaiveTime::MIN).and_utc())
}

/// The calendar date a stored date value represents.
pub fn stored_date(value: BsonDateTime) -> NaiveDate {
    value.to_chrono().date_naive()
}

/// `(year, month)` of a stored date value.
pub fn year_month(value: BsonDateTime) -> (i32, u32) {
    let date = stored_date(value);
    (date.year(), date.month())
}
