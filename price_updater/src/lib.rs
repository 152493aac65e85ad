//! Price Updater - Pokemon card catalog pricing
//!
//! Refreshes the market value of every card variety in the collection
//! catalog from the Pokemon TCG API and records one log row per run.

pub mod config;
pub mod error;
pub mod matching;
pub mod pokemontcg;
pub mod pricing;
pub mod run_log;
pub mod store;
pub mod updater;
pub mod web;

pub use config::{Backend, SupabaseSettings, UpdaterConfig};
pub use error::{Result, UpdaterError};
pub use pokemontcg::{PokemonTcgClient, PricingSource};
pub use run_log::{RunLogEntry, RunStatus, RunTotals};
pub use store::{CatalogStore, SqliteStore, SupabaseStore};
pub use updater::{PriceUpdater, RunReport};
