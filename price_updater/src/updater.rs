//! Price update run over the whole catalog
//!
//! Cards are processed in fixed-size batches. Cards inside a batch run
//! concurrently and fail independently; batches run one after another with
//! a fixed pause in between. A failing card is counted and summarized, it
//! never aborts the run. Only a catalog read failure does.

use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tcg_common::{CardError, CatalogCard};
use tokio::sync::Mutex;

use crate::config::UpdaterConfig;
use crate::error::{Result, UpdaterError};
use crate::matching::{resolve_match, MatchConfidence};
use crate::pokemontcg::PricingSource;
use crate::pricing::extract_price;
use crate::run_log::{RunLog, RunStatus, RunTotals};
use crate::store::CatalogStore;

/// Outcome of one run
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub log_id: Option<i64>,
    pub status: RunStatus,
    pub totals: RunTotals,
    pub batches: usize,
    pub cooldowns: usize,
}

impl RunReport {
    pub fn message(&self) -> String {
        format!(
            "Updated {} cards with {} errors",
            self.totals.updated_count, self.totals.error_count
        )
    }
}

/// Per-card result when the card counts as updated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CardUpdate {
    /// Varieties that received a new market value
    pub priced: usize,
    /// Varieties left untouched because no usable price was found
    pub skipped: usize,
}

pub struct PriceUpdater {
    store: Arc<dyn CatalogStore>,
    source: Arc<dyn PricingSource>,
    config: UpdaterConfig,
    // serializes runs started from this process (scheduler and HTTP trigger)
    running: Mutex<()>,
}

/// Number of batches needed for `len` cards
pub fn batch_count(len: usize, batch_size: usize) -> usize {
    len.div_ceil(batch_size.max(1))
}

impl PriceUpdater {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        source: Arc<dyn PricingSource>,
        config: UpdaterConfig,
    ) -> Self {
        Self {
            store,
            source,
            config,
            running: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn CatalogStore> {
        &self.store
    }

    /// Run one full price update.
    ///
    /// Returns `CatalogFetchFailed` when the catalog can't be read; the
    /// run log row then stays `pending`.
    pub async fn run(&self) -> Result<RunReport> {
        let _guard = self.running.lock().await;

        log::info!("Starting card price update process using Pokemon TCG API...");
        let run_log = RunLog::open(self.store.as_ref(), Utc::now()).await;

        let cards = self.store.fetch_catalog().await.map_err(|e| {
            log::error!("Failed to fetch cards: {}", e);
            UpdaterError::CatalogFetchFailed(e.to_string())
        })?;
        log::info!("Found {} cards to update", cards.len());

        let batch_size = self.config.batch_size.max(1);
        let batches = batch_count(cards.len(), batch_size);
        let mut totals = RunTotals::default();
        let mut cooldowns = 0;

        for (index, batch) in cards.chunks(batch_size).enumerate() {
            log::debug!("Processing batch {}/{}", index + 1, batches);

            let results = join_all(batch.iter().map(|card| self.update_card(card))).await;
            for (card, result) in batch.iter().zip(results) {
                match result {
                    Ok(update) => {
                        log::info!(
                            "Successfully updated prices for {} ({} priced, {} skipped)",
                            card.name,
                            update.priced,
                            update.skipped
                        );
                        totals.record_success();
                    }
                    Err(e) => {
                        log::error!("Error updating card {}: {}", card.name, e);
                        totals.record_error(&card.name, &e);
                    }
                }
            }

            if index + 1 < batches {
                tokio::time::sleep(self.config.batch_delay).await;
                cooldowns += 1;
            }
        }

        let status = totals.status();
        log::info!(
            "Price update completed. Updated: {}, Errors: {} ({})",
            totals.updated_count,
            totals.error_count,
            status
        );

        let log_id = run_log.id();
        run_log.finalize(&totals).await;

        Ok(RunReport {
            log_id,
            status,
            totals,
            batches,
            cooldowns,
        })
    }

    /// Search, match and price a single card
    pub async fn update_card(&self, card: &CatalogCard) -> std::result::Result<CardUpdate, CardError> {
        let candidates = self.source.search(card).await?;
        let found = resolve_match(card, &candidates)?;
        let record = found.record;

        if found.confidence == MatchConfidence::Fallback {
            log::warn!(
                "Low-confidence match for {}: using first result {} ({})",
                card.name,
                record.name,
                record.external_id
            );
        }
        log::info!("Found match: {} from {}", record.name, record.set_name);

        if card.external_id.is_none() {
            if let Err(e) = self
                .store
                .attach_external_id(card.id, &record.external_id, record.image_url.as_deref())
                .await
            {
                log::warn!("Failed to store TCG id for {}: {}", card.name, e);
            }
        }

        let mut update = CardUpdate::default();
        if record.price_table.is_none() {
            log::info!("No pricing data available for {}", record.name);
            update.skipped = card.varieties.len();
            return Ok(update);
        }

        for variety in &card.varieties {
            match extract_price(record, variety) {
                Ok(price) => {
                    self.store
                        .update_variety_price(variety.id, price, Utc::now())
                        .await
                        .map_err(|e| {
                            log::error!("Failed to update price for variety {}: {}", variety.name, e);
                            CardError::Store(e.to_string())
                        })?;
                    log::info!("Updated price for {}: ${:.2}", variety.name, price);
                    update.priced += 1;
                }
                Err(CardError::NoPrice) => {
                    log::warn!("No suitable price found for variety {}", variety.name);
                    update.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(update)
    }
}

#[cfg(test)]
#[path = "updater_tests.rs"]
mod tests;
