//! Tests for the batch price update run.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tcg_common::{CardError, CatalogCard, ExternalCardRecord, Finish, PriceQuote, Variety};

use super::{batch_count, PriceUpdater};
use crate::config::UpdaterConfig;
use crate::error::{Result, UpdaterError};
use crate::pokemontcg::PricingSource;
use crate::run_log::{RunLogEntry, RunStatus, RunTotals};
use crate::store::{CatalogStore, SqliteStore};

/// In-memory pricing source keyed by card name; unknown names find nothing.
#[derive(Default)]
struct FakeSource {
    results: HashMap<String, std::result::Result<Vec<ExternalCardRecord>, CardError>>,
}

impl FakeSource {
    fn with(mut self, name: &str, records: Vec<ExternalCardRecord>) -> Self {
        self.results.insert(name.to_string(), Ok(records));
        self
    }

    fn failing(mut self, name: &str, err: CardError) -> Self {
        self.results.insert(name.to_string(), Err(err));
        self
    }
}

#[async_trait]
impl PricingSource for FakeSource {
    async fn search(
        &self,
        card: &CatalogCard,
    ) -> std::result::Result<Vec<ExternalCardRecord>, CardError> {
        self.results
            .get(&card.name)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Wraps a SQLite store and fails selected operations.
#[derive(Default)]
struct Faults {
    catalog: bool,
    run_log: bool,
    prices: bool,
}

struct FlakyStore {
    inner: SqliteStore,
    faults: Faults,
}

fn injected() -> UpdaterError {
    UpdaterError::InvalidData("injected failure".to_string())
}

#[async_trait]
impl CatalogStore for FlakyStore {
    async fn fetch_catalog(&self) -> Result<Vec<CatalogCard>> {
        if self.faults.catalog {
            return Err(injected());
        }
        self.inner.fetch_catalog().await
    }

    async fn attach_external_id(
        &self,
        card_id: i64,
        external_id: &str,
        image_url: Option<&str>,
    ) -> Result<()> {
        self.inner
            .attach_external_id(card_id, external_id, image_url)
            .await
    }

    async fn update_variety_price(
        &self,
        variety_id: i64,
        market_value: f64,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        if self.faults.prices {
            return Err(injected());
        }
        self.inner
            .update_variety_price(variety_id, market_value, updated_at)
            .await
    }

    async fn create_run_log(&self, started_at: DateTime<Utc>) -> Result<RunLogEntry> {
        if self.faults.run_log {
            return Err(injected());
        }
        self.inner.create_run_log(started_at).await
    }

    async fn finalize_run_log(&self, id: i64, totals: &RunTotals) -> Result<()> {
        self.inner.finalize_run_log(id, totals).await
    }

    async fn recent_run_logs(&self, limit: usize) -> Result<Vec<RunLogEntry>> {
        self.inner.recent_run_logs(limit).await
    }
}

fn card(id: i64, name: &str, set_name: &str, varieties: Vec<Variety>) -> CatalogCard {
    CatalogCard {
        id,
        name: name.to_string(),
        card_type: None,
        set_name: Some(set_name.to_string()),
        card_number: None,
        external_id: None,
        varieties,
    }
}

fn variety(id: i64, name: &str, rarity: &str, value: f64) -> Variety {
    Variety {
        id,
        card_id: None,
        name: name.to_string(),
        rarity: Some(rarity.to_string()),
        market_value: Some(value),
    }
}

fn record(id: &str, name: &str, set_name: &str, prices: Vec<(Finish, f64)>) -> ExternalCardRecord {
    ExternalCardRecord {
        external_id: id.to_string(),
        name: name.to_string(),
        set_name: set_name.to_string(),
        set_series: String::new(),
        number: String::new(),
        image_url: Some(format!("https://images.example/{}.png", id)),
        price_table: Some(
            prices
                .into_iter()
                .map(|(finish, market)| (finish, PriceQuote::with_market(market)))
                .collect(),
        ),
    }
}

fn fast_config() -> UpdaterConfig {
    UpdaterConfig::new(5, Duration::from_millis(1)).unwrap()
}

fn seeded_store(cards: &[CatalogCard]) -> SqliteStore {
    let store = SqliteStore::open_in_memory().unwrap();
    for c in cards {
        store.insert_card(c).unwrap();
    }
    store
}

/// `count` cards named "Card N", each with one normal variety priced by the source
fn priced_catalog(count: i64) -> (Vec<CatalogCard>, FakeSource) {
    let mut source = FakeSource::default();
    let cards = (1..=count)
        .map(|i| {
            let name = format!("Card {}", i);
            source = std::mem::take(&mut source).with(
                &name,
                vec![record(&format!("x-{}", i), &name, "Base", vec![(Finish::Normal, i as f64)])],
            );
            card(i, &name, "Base", vec![variety(i * 10, "Unlimited", "Common", 0.5)])
        })
        .collect();
    (cards, source)
}

// ── batching ─────────────────────────────────────────────────────────

#[test]
fn batch_count_rounds_up() {
    assert_eq!(batch_count(0, 5), 0);
    assert_eq!(batch_count(5, 5), 1);
    assert_eq!(batch_count(12, 5), 3);
}

#[tokio::test]
async fn empty_catalog_is_trivial_success() {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let updater = PriceUpdater::new(store.clone(), Arc::new(FakeSource::default()), fast_config());

    let report = updater.run().await.unwrap();
    assert_eq!(report.status, RunStatus::Success);
    assert_eq!(report.totals, RunTotals::default());
    assert_eq!(report.batches, 0);
    assert_eq!(report.cooldowns, 0);

    let logs = store.recent_run_logs(1).await.unwrap();
    assert_eq!(logs[0].status, RunStatus::Success);
    assert_eq!(Some(logs[0].id), report.log_id);
}

#[tokio::test]
async fn twelve_cards_form_three_batches_with_two_pauses() {
    let (cards, source) = priced_catalog(12);
    let store = Arc::new(seeded_store(&cards));
    let updater = PriceUpdater::new(store.clone(), Arc::new(source), fast_config());

    let report = updater.run().await.unwrap();
    assert_eq!(report.batches, 3);
    assert_eq!(report.cooldowns, 2);
    assert_eq!(report.status, RunStatus::Success);
    assert_eq!(report.totals.updated_count, 12);
    assert_eq!(store.variety_market_value(120).unwrap(), Some(12.0));
}

// ── status classification ────────────────────────────────────────────

#[tokio::test]
async fn seven_of_ten_is_partial_success() {
    let (mut cards, source) = priced_catalog(7);
    for i in 8..=10 {
        cards.push(card(i, &format!("Unknown {}", i), "Base", vec![]));
    }
    let store = Arc::new(seeded_store(&cards));
    let updater = PriceUpdater::new(store.clone(), Arc::new(source), fast_config());

    let report = updater.run().await.unwrap();
    assert_eq!(report.status, RunStatus::PartialSuccess);
    assert_eq!(report.totals.updated_count, 7);
    assert_eq!(report.totals.error_count, 3);

    let logs = store.recent_run_logs(1).await.unwrap();
    let details = logs[0].error_details.as_deref().unwrap();
    assert_eq!(details.lines().count(), 3);
    assert!(details.starts_with("Unknown 8: No suitable card match found"));
}

#[tokio::test]
async fn only_errors_is_failed() {
    let cards = vec![card(1, "Pikachu", "Base", vec![]), card(2, "Mew", "Promo", vec![])];
    let source = FakeSource::default()
        .failing("Pikachu", CardError::SourceUnavailable("500 Internal Server Error".into()));
    let store = Arc::new(seeded_store(&cards));
    let updater = PriceUpdater::new(store.clone(), Arc::new(source), fast_config());

    let report = updater.run().await.unwrap();
    assert_eq!(report.status, RunStatus::Failed);
    assert_eq!(
        report.totals.error_details,
        vec![
            "Pikachu: Pokemon TCG API request failed: 500 Internal Server Error".to_string(),
            "Mew: No suitable card match found".to_string(),
        ]
    );
}

#[tokio::test]
async fn failing_card_does_not_affect_batch_siblings() {
    let cards = vec![
        card(1, "Pikachu", "Base", vec![variety(10, "Unlimited", "Common", 0.5)]),
        card(2, "Missingno", "Base", vec![variety(20, "Glitch", "Rare", 9.0)]),
        card(3, "Raichu", "Base", vec![variety(30, "Unlimited", "Rare", 2.0)]),
    ];
    let source = FakeSource::default()
        .with("Pikachu", vec![record("base1-58", "Pikachu", "Base", vec![(Finish::Normal, 1.1)])])
        .with("Raichu", vec![record("base1-14", "Raichu", "Base", vec![(Finish::Normal, 3.3)])]);
    let store = Arc::new(seeded_store(&cards));
    let updater = PriceUpdater::new(store.clone(), Arc::new(source), fast_config());

    let report = updater.run().await.unwrap();
    assert_eq!(report.totals.updated_count, 2);
    assert_eq!(report.totals.error_count, 1);
    assert_eq!(store.variety_market_value(10).unwrap(), Some(1.1));
    assert_eq!(store.variety_market_value(20).unwrap(), Some(9.0));
    assert_eq!(store.variety_market_value(30).unwrap(), Some(3.3));
}

// ── per-card pipeline ────────────────────────────────────────────────

#[tokio::test]
async fn first_edition_holo_variety_gets_first_edition_quote() {
    let cards = vec![card(
        1,
        "Charizard",
        "Base",
        vec![
            variety(10, "1st Edition Holo", "Rare Holo", 1.0),
            variety(11, "Unlimited", "Rare Holo", 1.0),
        ],
    )];
    let source = FakeSource::default().with(
        "Charizard",
        vec![record(
            "base1-4",
            "Charizard",
            "Base",
            vec![(Finish::Holofoil, 50.0), (Finish::FirstEditionHolofoil, 200.0)],
        )],
    );
    let store = Arc::new(seeded_store(&cards));
    let updater = PriceUpdater::new(store.clone(), Arc::new(source), fast_config());

    updater.run().await.unwrap();
    assert_eq!(store.variety_market_value(10).unwrap(), Some(200.0));
    assert_eq!(store.variety_market_value(11).unwrap(), Some(50.0));
}

#[tokio::test]
async fn zero_market_quote_leaves_value_unchanged() {
    let cards = vec![card(1, "Pikachu", "Base", vec![variety(10, "Unlimited", "Common", 4.0)])];
    let source = FakeSource::default().with(
        "Pikachu",
        vec![record("base1-58", "Pikachu", "Base", vec![(Finish::Normal, 0.0)])],
    );
    let store = Arc::new(seeded_store(&cards));
    let updater = PriceUpdater::new(store.clone(), Arc::new(source), fast_config());

    let update = updater.update_card(&cards[0]).await.unwrap();
    assert_eq!(update.priced, 0);
    assert_eq!(update.skipped, 1);
    assert_eq!(store.variety_market_value(10).unwrap(), Some(4.0));
}

#[tokio::test]
async fn record_without_prices_still_attaches_external_id() {
    let cards = vec![card(1, "Mew", "Promo", vec![variety(10, "Promo", "Rare", 4.0)])];
    let mut rec = record("promo-8", "Mew", "Wizards Black Star Promos", vec![]);
    rec.price_table = None;
    let source = FakeSource::default().with("Mew", vec![rec]);
    let store = Arc::new(seeded_store(&cards));
    let updater = PriceUpdater::new(store.clone(), Arc::new(source), fast_config());

    let report = updater.run().await.unwrap();
    assert_eq!(report.totals.updated_count, 1);
    let catalog = store.fetch_catalog().await.unwrap();
    assert_eq!(catalog[0].external_id.as_deref(), Some("promo-8"));
    assert_eq!(store.variety_market_value(10).unwrap(), Some(4.0));
}

#[tokio::test]
async fn existing_external_id_is_not_overwritten() {
    let mut c = card(1, "Pikachu", "Base", vec![]);
    c.external_id = Some("base1-58".to_string());
    let cards = vec![c];
    let source = FakeSource::default().with(
        "Pikachu",
        vec![record("base2-60", "Raichu", "Jungle", vec![(Finish::Normal, 1.0)])],
    );
    let store = Arc::new(seeded_store(&cards));
    let updater = PriceUpdater::new(store.clone(), Arc::new(source), fast_config());

    updater.run().await.unwrap();
    let catalog = store.fetch_catalog().await.unwrap();
    assert_eq!(catalog[0].external_id.as_deref(), Some("base1-58"));
}

#[tokio::test]
async fn second_run_with_unchanged_prices_is_idempotent() {
    let (cards, source) = priced_catalog(6);
    let store = Arc::new(seeded_store(&cards));
    let updater = PriceUpdater::new(store.clone(), Arc::new(source), fast_config());

    updater.run().await.unwrap();
    let after_first: Vec<Option<f64>> = (1..=6)
        .map(|i| store.variety_market_value(i * 10).unwrap())
        .collect();

    updater.run().await.unwrap();
    let after_second: Vec<Option<f64>> = (1..=6)
        .map(|i| store.variety_market_value(i * 10).unwrap())
        .collect();

    assert_eq!(after_first, after_second);
    assert_eq!(store.recent_run_logs(10).await.unwrap().len(), 2);
}

// ── failure handling ─────────────────────────────────────────────────

#[tokio::test]
async fn catalog_failure_aborts_and_leaves_log_pending() {
    let store = Arc::new(FlakyStore {
        inner: SqliteStore::open_in_memory().unwrap(),
        faults: Faults {
            catalog: true,
            ..Faults::default()
        },
    });
    let updater = PriceUpdater::new(store.clone(), Arc::new(FakeSource::default()), fast_config());

    let err = updater.run().await.unwrap_err();
    assert!(matches!(err, UpdaterError::CatalogFetchFailed(_)));

    let logs = store.recent_run_logs(1).await.unwrap();
    assert_eq!(logs[0].status, RunStatus::Pending);
}

#[tokio::test]
async fn run_log_failure_does_not_abort_run() {
    let (cards, source) = priced_catalog(2);
    let store = Arc::new(FlakyStore {
        inner: seeded_store(&cards),
        faults: Faults {
            run_log: true,
            ..Faults::default()
        },
    });
    let updater = PriceUpdater::new(store.clone(), Arc::new(source), fast_config());

    let report = updater.run().await.unwrap();
    assert_eq!(report.log_id, None);
    assert_eq!(report.totals.updated_count, 2);
    assert!(store.recent_run_logs(1).await.unwrap().is_empty());
}

#[tokio::test]
async fn variety_write_failure_fails_the_card() {
    let (cards, source) = priced_catalog(1);
    let store = Arc::new(FlakyStore {
        inner: seeded_store(&cards),
        faults: Faults {
            prices: true,
            ..Faults::default()
        },
    });
    let updater = PriceUpdater::new(store.clone(), Arc::new(source), fast_config());

    let report = updater.run().await.unwrap();
    assert_eq!(report.status, RunStatus::Failed);
    assert_eq!(
        report.totals.error_details,
        vec!["Card 1: Failed to persist price: Invalid stored value: injected failure".to_string()]
    );
}
