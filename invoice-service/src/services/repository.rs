//! Persistence seam for invoices.
//!
//! Handlers only see [`InvoiceRepository`]. [`MongoInvoiceRepository`] is the
//! production store; [`InMemoryInvoiceRepository`] keeps documents in process
//! and applies the same filter semantics, for tests and local runs.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::options::FindOptions;
use service_core::error::AppError;
use std::sync::Mutex;

use crate::models::invoice::{Invoice, ID};
use crate::services::database::MongoDb;
use crate::services::filter::InvoiceFilter;
use crate::services::monthly::{self, MonthlySummary};

#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// Fails with [`AppError::StoreUnavailable`] when the store cannot serve requests.
    async fn ensure_ready(&self) -> Result<(), AppError>;

    async fn ping(&self) -> Result<(), AppError>;

    /// Matching invoices, most recently created first.
    async fn find(&self, filter: &InvoiceFilter) -> Result<Vec<Document>, AppError>;

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Document>, AppError>;

    async fn insert(&self, invoice: Document) -> Result<ObjectId, AppError>;

    /// Applies `changes` as a partial update. `true` only if a stored value changed.
    async fn update(&self, id: &ObjectId, changes: Document) -> Result<bool, AppError>;

    async fn delete(&self, id: &ObjectId) -> Result<bool, AppError>;

    async fn monthly_summary(&self) -> Result<Vec<MonthlySummary>, AppError>;
}

pub struct MongoInvoiceRepository {
    db: MongoDb,
}

impl MongoInvoiceRepository {
    pub fn new(db: MongoDb) -> Self {
        Self { db }
    }
}

#[async_trait]
impl InvoiceRepository for MongoInvoiceRepository {
    async fn ensure_ready(&self) -> Result<(), AppError> {
        self.db.database().await.map(|_| ())
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.db.health_check().await
    }

    async fn find(&self, filter: &InvoiceFilter) -> Result<Vec<Document>, AppError> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();

        let cursor = self
            .db
            .invoices()
            .await?
            .find(filter.to_document(), options)
            .await
            .map_err(|e| {
                tracing::error!("Failed to query invoices: {}", e);
                AppError::from(e)
            })?;

        let invoices: Vec<Document> = cursor.try_collect().await?;
        Ok(invoices)
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Document>, AppError> {
        Ok(self
            .db
            .invoices()
            .await?
            .find_one(doc! { "_id": *id }, None)
            .await?)
    }

    async fn insert(&self, invoice: Document) -> Result<ObjectId, AppError> {
        let result = self.db.invoices().await?.insert_one(invoice, None).await?;
        result.inserted_id.as_object_id().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "Store returned a non-ObjectId identifier: {}",
                result.inserted_id
            ))
        })
    }

    async fn update(&self, id: &ObjectId, changes: Document) -> Result<bool, AppError> {
        let result = self
            .db
            .invoices()
            .await?
            .update_one(doc! { "_id": *id }, doc! { "$set": changes }, None)
            .await?;
        Ok(result.modified_count > 0)
    }

    async fn delete(&self, id: &ObjectId) -> Result<bool, AppError> {
        let result = self
            .db
            .invoices()
            .await?
            .delete_one(doc! { "_id": *id }, None)
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn monthly_summary(&self) -> Result<Vec<MonthlySummary>, AppError> {
        let invoices = self.db.invoices().await?;

        let groups: Vec<Document> = invoices
            .aggregate(monthly::pipeline(), None)
            .await?
            .try_collect()
            .await?;

        // Extra round trip; only when debug logging is on.
        if tracing::enabled!(tracing::Level::DEBUG) {
            let undated = invoices
                .count_documents(doc! { "date": { "$not": { "$type": "date" } } }, None)
                .await?;
            if undated > 0 {
                tracing::debug!(undated, "Invoices without a stored date left out of monthly totals");
            }
        }

        Ok(groups
            .iter()
            .filter_map(MonthlySummary::from_document)
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryInvoiceRepository {
    invoices: Mutex<Vec<Document>>,
}

impl InMemoryInvoiceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with documents as they would already be stored,
    /// assigning an `_id` to those without one.
    pub fn with_documents(documents: Vec<Document>) -> Self {
        let invoices = documents
            .into_iter()
            .map(|doc| {
                if doc.contains_key(ID) {
                    doc
                } else {
                    with_id(ObjectId::new(), doc)
                }
            })
            .collect();
        Self {
            invoices: Mutex::new(invoices),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<Document>>, AppError> {
        self.invoices
            .lock()
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("Invoice store mutex poisoned: {}", e)))
    }
}

/// `_id` first, as the document store lays it out.
fn with_id(id: ObjectId, invoice: Document) -> Document {
    let mut stored = doc! { "_id": id };
    stored.extend(invoice);
    stored
}

fn has_id(invoice: &Document, id: &ObjectId) -> bool {
    Invoice(invoice).id().as_ref() == Some(id)
}

#[async_trait]
impl InvoiceRepository for InMemoryInvoiceRepository {
    async fn ensure_ready(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn find(&self, filter: &InvoiceFilter) -> Result<Vec<Document>, AppError> {
        let mut found: Vec<Document> = self
            .lock()?
            .iter()
            .filter(|invoice| filter.matches(invoice))
            .cloned()
            .collect();
        // Missing `created_at` sorts last, as with a descending store sort.
        found.sort_by(|a, b| Invoice(b).created_at().cmp(&Invoice(a).created_at()));
        Ok(found)
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Document>, AppError> {
        Ok(self.lock()?.iter().find(|invoice| has_id(invoice, id)).cloned())
    }

    async fn insert(&self, mut invoice: Document) -> Result<ObjectId, AppError> {
        invoice.remove(ID);
        let id = ObjectId::new();
        self.lock()?.push(with_id(id, invoice));
        Ok(id)
    }

    async fn update(&self, id: &ObjectId, changes: Document) -> Result<bool, AppError> {
        let mut invoices = self.lock()?;
        let Some(stored) = invoices.iter_mut().find(|invoice| has_id(invoice, id)) else {
            return Ok(false);
        };

        let mut modified = false;
        for (key, value) in changes {
            if stored.get(&key) != Some(&value) {
                stored.insert(key, value);
                modified = true;
            }
        }
        Ok(modified)
    }

    async fn delete(&self, id: &ObjectId) -> Result<bool, AppError> {
        let mut invoices = self.lock()?;
        let before = invoices.len();
        invoices.retain(|invoice| !has_id(invoice, id));
        Ok(invoices.len() < before)
    }

    async fn monthly_summary(&self) -> Result<Vec<MonthlySummary>, AppError> {
        let snapshot = self.lock()?.clone();
        let grouping = monthly::group_by_month(snapshot);
        if grouping.undated > 0 {
            tracing::debug!(
                undated = grouping.undated,
                "Invoices without a stored date left out of monthly totals"
            );
        }
        Ok(grouping.groups)
    }
}
