//! Domain types for stockseries

pub mod record;

pub use record::{NormalizedRecord, PriceField, FIELD_NAMES};
