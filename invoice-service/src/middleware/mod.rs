pub mod auth;
pub mod database;

pub use auth::{require_login_api, require_login_page};
pub use database::require_db;
