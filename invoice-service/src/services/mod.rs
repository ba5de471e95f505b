pub mod auth;
pub mod coercion;
pub mod database;
pub mod export;
pub mod filter;
pub mod metrics;
pub mod monthly;
pub mod normalizer;
pub mod repository;

pub use auth::{AuthProvider, StaticAdminAuth};
pub use database::MongoDb;
pub use filter::InvoiceFilter;
pub use metrics::{get_metrics, init_metrics};
pub use repository::{InMemoryInvoiceRepository, InvoiceRepository, MongoInvoiceRepository};
