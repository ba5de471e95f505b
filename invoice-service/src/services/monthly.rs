//! Monthly totals: invoices grouped by the year and month of their `date`.
//!
//! Only invoices whose `date` is a stored date value take part. Invoices
//! without one are counted by [`group_by_month`] but belong to no group,
//! unlike listings, which fall back to `created_at`.

use mongodb::bson::{doc, Bson, Document};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::models::invoice::{bson_as_f64, Invoice};
use crate::services::filter::year_month;
use crate::services::normalizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlySummary {
    pub period: Period,
    pub count: i64,
    pub total_amount: f64,
    pub invoices: Vec<Document>,
}

/// Wire shape of one group: `{_id: {year, month}, count, total_amount, invoices}`.
#[derive(Debug, Serialize)]
pub struct MonthlySummaryResponse {
    #[serde(rename = "_id")]
    pub id: Period,
    pub count: i64,
    pub total_amount: f64,
    pub invoices: Vec<Value>,
}

impl From<&MonthlySummary> for MonthlySummaryResponse {
    fn from(summary: &MonthlySummary) -> Self {
        Self {
            id: summary.period,
            count: summary.count,
            total_amount: summary.total_amount,
            invoices: normalizer::to_json_list(&summary.invoices),
        }
    }
}

/// Result of grouping in process.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyGrouping {
    pub groups: Vec<MonthlySummary>,
    pub undated: usize,
}

/// Groups invoices newest period first; members keep their input order.
pub fn group_by_month(invoices: Vec<Document>) -> MonthlyGrouping {
    let mut groups: BTreeMap<Period, MonthlySummary> = BTreeMap::new();
    let mut undated = 0;

    for invoice in invoices {
        let Some(date) = Invoice(&invoice).date() else {
            undated += 1;
            continue;
        };
        let (year, month) = year_month(date);
        let period = Period { year, month };
        let amount = Invoice(&invoice).amount().unwrap_or(0.0);

        let entry = groups.entry(period).or_insert_with(|| MonthlySummary {
            period,
            count: 0,
            total_amount: 0.0,
            invoices: Vec::new(),
        });
        entry.count += 1;
        entry.total_amount += amount;
        entry.invoices.push(invoice);
    }

    MonthlyGrouping {
        groups: groups.into_values().rev().collect(),
        undated,
    }
}

/// The same grouping as an aggregation pipeline for the document store.
pub fn pipeline() -> Vec<Document> {
    vec![
        doc! { "$match": { "date": { "$type": "date" } } },
        doc! {
            "$group": {
                "_id": {
                    "year": { "$year": "$date" },
                    "month": { "$month": "$date" },
                },
                "count": { "$sum": 1 },
                "total_amount": { "$sum": "$amount" },
                "invoices": { "$push": "$$ROOT" },
            }
        },
        doc! { "$sort": { "_id.year": -1, "_id.month": -1 } },
    ]
}

impl MonthlySummary {
    /// Reads one `$group` output document produced by [`pipeline`].
    pub fn from_document(doc: &Document) -> Option<Self> {
        let key = doc.get_document("_id").ok()?;
        let year = key.get("year").and_then(bson_as_f64)? as i32;
        let month = key.get("month").and_then(bson_as_f64)? as u32;
        let count = doc.get("count").and_then(bson_as_f64).unwrap_or(0.0) as i64;
        let total_amount = doc.get("total_amount").and_then(bson_as_f64).unwrap_or(0.0);
        let invoices = doc
            .get_array("invoices")
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| match item {
                        Bson::Document(d) => Some(d.clone()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            period: Period { year, month },
            count,
            total_amount,
            invoices,
        })
    }
}
