pub mod app;
pub mod auth;
pub mod invoices;

pub use app::{favicon_ico, favicon_png, health_check, index, metrics_endpoint, readiness_check};
pub use auth::{login_handler, login_page, logout_handler};
pub use invoices::{
    create_invoice, delete_invoice, export_csv, get_invoice, list_invoices, monthly_summary,
    update_invoice,
};
