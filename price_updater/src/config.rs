//! Runtime configuration for the updater

use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, UpdaterError};

/// Cards processed concurrently per batch
pub const DEFAULT_BATCH_SIZE: usize = 5;
/// Pause between batches, as a courtesy to the pricing API
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdaterConfig {
    pub batch_size: usize,
    pub batch_delay: Duration,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay: DEFAULT_BATCH_DELAY,
        }
    }
}

impl UpdaterConfig {
    pub fn new(batch_size: usize, batch_delay: Duration) -> Result<Self> {
        if batch_size == 0 {
            return Err(UpdaterError::Config(
                "batch size must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            batch_size,
            batch_delay,
        })
    }
}

/// Period between scheduled runs; absurdly large values saturate
pub fn schedule_period(interval_hours: u64) -> Duration {
    Duration::from_secs(interval_hours.saturating_mul(3600))
}

/// Where the catalog lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Hosted Supabase project (REST interface)
    Supabase,
    /// Local SQLite file
    Sqlite,
}

/// Connection settings for the hosted catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupabaseSettings {
    pub url: String,
    pub service_key: String,
}

impl SupabaseSettings {
    /// Both values are required; blank counts as missing.
    pub fn resolve(url: Option<String>, service_key: Option<String>) -> Result<Self> {
        let url = required(url, "SUPABASE_URL")?;
        let service_key = required(service_key, "SUPABASE_SERVICE_ROLE_KEY")?;
        Ok(Self { url, service_key })
    }
}

fn required(value: Option<String>, name: &str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| UpdaterError::Config(format!("{} is not set", name)))
}

/// Returns the default database path: ~/.local/share/price_updater/catalog.db
pub fn default_db_path() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("price_updater")
        .join("catalog.db")
        .to_string_lossy()
        .to_string()
}
