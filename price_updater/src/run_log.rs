//! One `price_update_logs` row per run
//!
//! The row is created `pending` when a run starts and finalized once when it
//! ends. Both writes are best-effort: failures are logged and the run goes on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::UpdaterError;
use crate::store::CatalogStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Success,
    PartialSuccess,
    Failed,
}

impl RunStatus {
    /// Terminal status for a finished run
    pub fn classify(updated_count: usize, error_count: usize) -> Self {
        if error_count == 0 {
            RunStatus::Success
        } else if updated_count > 0 {
            RunStatus::PartialSuccess
        } else {
            RunStatus::Failed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Success => "success",
            RunStatus::PartialSuccess => "partial_success",
            RunStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = UpdaterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RunStatus::Pending),
            "success" => Ok(RunStatus::Success),
            "partial_success" => Ok(RunStatus::PartialSuccess),
            "failed" => Ok(RunStatus::Failed),
            other => Err(UpdaterError::InvalidData(format!("unknown run status: {}", other))),
        }
    }
}

/// A `price_update_logs` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunLogEntry {
    pub id: i64,
    #[serde(rename = "update_timestamp")]
    pub started_at: DateTime<Utc>,
    pub status: RunStatus,
    #[serde(rename = "updated_cards", default, deserialize_with = "null_as_zero")]
    pub updated_count: u32,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub error_count: u32,
    #[serde(default)]
    pub error_details: Option<String>,
}

fn null_as_zero<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u32>::deserialize(deserializer)?.unwrap_or(0))
}

/// Aggregate result of a run, as written to the final log row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunTotals {
    pub updated_count: usize,
    pub error_count: usize,
    /// One `"<card name>: <message>"` line per failed card
    pub error_details: Vec<String>,
}

impl RunTotals {
    pub fn record_success(&mut self) {
        self.updated_count += 1;
    }

    pub fn record_error(&mut self, card_name: &str, message: impl fmt::Display) {
        self.error_count += 1;
        self.error_details.push(format!("{}: {}", card_name, message));
    }

    pub fn status(&self) -> RunStatus {
        RunStatus::classify(self.updated_count, self.error_count)
    }

    /// Newline-joined details, `None` when there were no errors
    pub fn joined_details(&self) -> Option<String> {
        if self.error_details.is_empty() {
            None
        } else {
            Some(self.error_details.join("\n"))
        }
    }
}

/// Handle on the current run's log row
///
/// `finalize` consumes the handle, so a row is finalized at most once.
pub struct RunLog<'a> {
    store: &'a dyn CatalogStore,
    id: Option<i64>,
}

impl<'a> RunLog<'a> {
    /// Insert the `pending` row. A failed insert leaves the handle detached.
    pub async fn open(store: &'a dyn CatalogStore, started_at: DateTime<Utc>) -> RunLog<'a> {
        let id = match store.create_run_log(started_at).await {
            Ok(entry) => {
                log::debug!("Created run log entry {}", entry.id);
                Some(entry.id)
            }
            Err(e) => {
                log::warn!("Failed to create log entry: {}", e);
                None
            }
        };
        RunLog { store, id }
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    /// Write the terminal status and totals
    pub async fn finalize(self, totals: &RunTotals) {
        let Some(id) = self.id else {
            log::warn!("No run log entry to finalize");
            return;
        };

        if let Err(e) = self.store.finalize_run_log(id, totals).await {
            log::warn!("Failed to finalize log entry {}: {}", id, e);
        }
    }
}
