pub mod invoice;

pub use invoice::Invoice;
