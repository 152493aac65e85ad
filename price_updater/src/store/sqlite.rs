//! Local SQLite catalog
//!
//! Mirrors the hosted tables so the updater can run without the hosted
//! database. Uses parameterized queries exclusively.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tcg_common::{CatalogCard, Variety};

use super::CatalogStore;
use crate::error::{Result, UpdaterError};
use crate::run_log::{RunLogEntry, RunStatus, RunTotals};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database file and make sure the schema exists
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        log::info!("Opened database: {}", path.display());
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| UpdaterError::LockPoisoned)
    }

    /// Insert or replace a card and its varieties
    pub fn insert_card(&self, card: &CatalogCard) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO pokemon_cards (id, name, type, set_name, card_number, tcg_player_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                card.id,
                &card.name,
                card.card_type.as_deref().unwrap_or_default(),
                &card.set_name,
                &card.card_number,
                &card.external_id,
            ],
        )?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO card_varieties (id, card_id, name, rarity, market_value)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for variety in &card.varieties {
                stmt.execute(params![
                    variety.id,
                    card.id,
                    &variety.name,
                    &variety.rarity,
                    variety.market_value,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Current market value of a variety (`None` if unknown or unset)
    pub fn variety_market_value(&self, variety_id: i64) -> Result<Option<f64>> {
        let conn = self.conn()?;
        let value = conn
            .query_row(
                "SELECT market_value FROM card_varieties WHERE id = ?1",
                params![variety_id],
                |row| row.get::<_, Option<f64>>(0),
            )
            .optional()?;
        Ok(value.flatten())
    }
}

/// Create tables if they don't exist:
/// - `pokemon_cards`: catalog cards
/// - `card_varieties`: printings of a card, each with its own market value
/// - `price_update_logs`: one row per price update run
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS pokemon_cards (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            type TEXT NOT NULL DEFAULT '',
            hp TEXT NOT NULL DEFAULT '',
            set_name TEXT,
            card_number TEXT,
            image_url TEXT,
            tcg_player_id TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS card_varieties (
            id INTEGER PRIMARY KEY,
            card_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            rarity TEXT,
            image_url TEXT,
            market_value REAL,
            updated_at TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (card_id) REFERENCES pokemon_cards(id)
        );

        CREATE INDEX IF NOT EXISTS idx_card_varieties_card ON card_varieties(card_id);

        CREATE TABLE IF NOT EXISTS price_update_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            updated_cards INTEGER NOT NULL DEFAULT 0,
            error_count INTEGER NOT NULL DEFAULT 0,
            update_timestamp TEXT NOT NULL,
            status TEXT NOT NULL,
            error_details TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_price_update_logs_timestamp
            ON price_update_logs(update_timestamp);
        ",
    )?;

    log::debug!("Database schema initialized");
    Ok(())
}

fn load_catalog(conn: &Connection) -> Result<Vec<CatalogCard>> {
    let mut varieties: HashMap<i64, Vec<Variety>> = HashMap::new();
    {
        let mut stmt = conn.prepare(
            "SELECT id, card_id, name, rarity, market_value
             FROM card_varieties
             ORDER BY card_id, id",
        )?;
        let rows = stmt.query_map([], |row| {
            let card_id: i64 = row.get(1)?;
            Ok((
                card_id,
                Variety {
                    id: row.get(0)?,
                    card_id: Some(card_id),
                    name: row.get(2)?,
                    rarity: row.get(3)?,
                    market_value: row.get(4)?,
                },
            ))
        })?;
        for row in rows {
            let (card_id, variety) = row?;
            varieties.entry(card_id).or_default().push(variety);
        }
    }

    let mut stmt = conn.prepare(
        "SELECT id, name, type, set_name, card_number, tcg_player_id
         FROM pokemon_cards
         ORDER BY id",
    )?;
    let cards = stmt
        .query_map([], |row| {
            Ok(CatalogCard {
                id: row.get(0)?,
                name: row.get(1)?,
                card_type: row.get(2)?,
                set_name: row.get(3)?,
                card_number: row.get(4)?,
                external_id: row.get(5)?,
                varieties: Vec::new(),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(cards
        .into_iter()
        .map(|mut card| {
            card.varieties = varieties.remove(&card.id).unwrap_or_default();
            card
        })
        .collect())
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| UpdaterError::InvalidData(format!("timestamp {:?}: {}", value, e)))
}

fn load_run_logs(conn: &Connection, limit: usize) -> Result<Vec<RunLogEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, update_timestamp, status, updated_cards, error_count, error_details
         FROM price_update_logs
         ORDER BY update_timestamp DESC, id DESC
         LIMIT ?1",
    )?;

    let rows = stmt
        .query_map(params![limit], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, u32>(3)?,
                row.get::<_, u32>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    rows.into_iter()
        .map(
            |(id, timestamp, status, updated_count, error_count, error_details)| {
                Ok(RunLogEntry {
                    id,
                    started_at: parse_timestamp(&timestamp)?,
                    status: status.parse()?,
                    updated_count,
                    error_count,
                    error_details,
                })
            },
        )
        .collect()
}

#[async_trait]
impl CatalogStore for SqliteStore {
    async fn fetch_catalog(&self) -> Result<Vec<CatalogCard>> {
        let conn = self.conn()?;
        load_catalog(&conn)
    }

    async fn attach_external_id(
        &self,
        card_id: i64,
        external_id: &str,
        image_url: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE pokemon_cards
             SET tcg_player_id = ?1, image_url = COALESCE(?2, image_url)
             WHERE id = ?3",
            params![external_id, image_url, card_id],
        )?;
        Ok(())
    }

    async fn update_variety_price(
        &self,
        variety_id: i64,
        market_value: f64,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE card_varieties SET market_value = ?1, updated_at = ?2 WHERE id = ?3",
            params![market_value, updated_at.to_rfc3339(), variety_id],
        )?;
        if changed == 0 {
            log::debug!("No variety with id {} to update", variety_id);
        }
        Ok(())
    }

    async fn create_run_log(&self, started_at: DateTime<Utc>) -> Result<RunLogEntry> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO price_update_logs (update_timestamp, status) VALUES (?1, ?2)",
            params![started_at.to_rfc3339(), RunStatus::Pending.as_str()],
        )?;
        Ok(RunLogEntry {
            id: conn.last_insert_rowid(),
            started_at,
            status: RunStatus::Pending,
            updated_count: 0,
            error_count: 0,
            error_details: None,
        })
    }

    async fn finalize_run_log(&self, id: i64, totals: &RunTotals) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE price_update_logs
             SET updated_cards = ?1, error_count = ?2, status = ?3, error_details = ?4
             WHERE id = ?5",
            params![
                totals.updated_count,
                totals.error_count,
                totals.status().as_str(),
                totals.joined_details(),
                id,
            ],
        )?;
        Ok(())
    }

    async fn recent_run_logs(&self, limit: usize) -> Result<Vec<RunLogEntry>> {
        let conn = self.conn()?;
        load_run_logs(&conn, limit)
    }
}
