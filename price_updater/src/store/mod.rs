//! Catalog and run-log persistence
//!
//! The backend is chosen once at startup; everything downstream works
//! against [`CatalogStore`].

mod sqlite;
mod supabase;

pub use sqlite::SqliteStore;
pub use supabase::SupabaseStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tcg_common::CatalogCard;

use crate::error::Result;
use crate::run_log::{RunLogEntry, RunTotals};

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// All catalog cards with their varieties, ordered by card id
    async fn fetch_catalog(&self) -> Result<Vec<CatalogCard>>;

    /// Remember the Pokemon TCG id (and large image) of a matched card
    async fn attach_external_id(
        &self,
        card_id: i64,
        external_id: &str,
        image_url: Option<&str>,
    ) -> Result<()>;

    async fn update_variety_price(
        &self,
        variety_id: i64,
        market_value: f64,
        updated_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Insert a `pending` run log row
    async fn create_run_log(&self, started_at: DateTime<Utc>) -> Result<RunLogEntry>;

    /// Set the terminal status and totals of a run log row
    async fn finalize_run_log(&self, id: i64, totals: &RunTotals) -> Result<()>;

    /// Most recent run log rows, newest first
    async fn recent_run_logs(&self, limit: usize) -> Result<Vec<RunLogEntry>>;
}
