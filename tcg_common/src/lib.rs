//! Shared types for Pokemon card pricing
//!
//! Catalog records as they live in the collection database, search results
//! from the Pokemon TCG API and the per-card error taxonomy used by the
//! price updater.

pub mod catalog;
pub mod error;
pub mod tcg;

pub use catalog::{CatalogCard, Variety};
pub use error::CardError;
pub use tcg::{ExternalCardRecord, Finish, PriceQuote, PriceTable};
