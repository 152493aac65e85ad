//! Hosted catalog reached through the Supabase REST (PostgREST) interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use tcg_common::CatalogCard;

use super::CatalogStore;
use crate::error::{Result, UpdaterError};
use crate::run_log::{RunLogEntry, RunStatus, RunTotals};

const CATALOG_SELECT: &str =
    "id,name,type,set_name,card_number,tcg_player_id,card_varieties(id,card_id,name,rarity,market_value)";

pub struct SupabaseStore {
    client: reqwest::Client,
    rest_url: String,
    service_key: String,
}

#[derive(Serialize)]
struct ExternalIdPatch<'a> {
    tcg_player_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_url: Option<&'a str>,
}

#[derive(Serialize)]
struct PricePatch {
    market_value: f64,
    updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct NewRunLog {
    status: RunStatus,
    update_timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
struct RunLogPatch {
    updated_cards: usize,
    error_count: usize,
    status: RunStatus,
    error_details: Option<String>,
}

impl SupabaseStore {
    /// `project_url` is the project base URL, e.g. `https://xyz.supabase.co`
    pub fn new(project_url: &str, service_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            rest_url: format!("{}/rest/v1", project_url.trim_end_matches('/')),
            service_key: service_key.into(),
        }
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/{}", self.rest_url, table))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(UpdaterError::HttpStatus { status, body })
        }
    }

    async fn patch_by_id<T: Serialize + Sync>(&self, table: &str, id: i64, body: &T) -> Result<()> {
        let response = self
            .request(Method::PATCH, table)
            .query(&[("id", format!("eq.{}", id))])
            .json(body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for SupabaseStore {
    async fn fetch_catalog(&self) -> Result<Vec<CatalogCard>> {
        let response = self
            .request(Method::GET, "pokemon_cards")
            .query(&[("select", CATALOG_SELECT), ("order", "id.asc")])
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn attach_external_id(
        &self,
        card_id: i64,
        external_id: &str,
        image_url: Option<&str>,
    ) -> Result<()> {
        let patch = ExternalIdPatch {
            tcg_player_id: external_id,
            image_url,
        };
        self.patch_by_id("pokemon_cards", card_id, &patch).await
    }

    async fn update_variety_price(
        &self,
        variety_id: i64,
        market_value: f64,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let patch = PricePatch {
            market_value,
            updated_at,
        };
        self.patch_by_id("card_varieties", variety_id, &patch).await
    }

    async fn create_run_log(&self, started_at: DateTime<Utc>) -> Result<RunLogEntry> {
        let row = NewRunLog {
            status: RunStatus::Pending,
            update_timestamp: started_at,
        };
        let response = self
            .request(Method::POST, "price_update_logs")
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;

        let mut rows: Vec<RunLogEntry> = Self::check(response).await?.json().await?;
        if rows.is_empty() {
            return Err(UpdaterError::LogPersistenceFailed(
                "insert returned no row".to_string(),
            ));
        }
        Ok(rows.swap_remove(0))
    }

    async fn finalize_run_log(&self, id: i64, totals: &RunTotals) -> Result<()> {
        let patch = RunLogPatch {
            updated_cards: totals.updated_count,
            error_count: totals.error_count,
            status: totals.status(),
            error_details: totals.joined_details(),
        };
        self.patch_by_id("price_update_logs", id, &patch).await
    }

    async fn recent_run_logs(&self, limit: usize) -> Result<Vec<RunLogEntry>> {
        let response = self
            .request(Method::GET, "price_update_logs")
            .query(&[
                ("select", "*".to_string()),
                ("order", "update_timestamp.desc".to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }
}

#[cfg(test)]
#[path = "supabase_tests.rs"]
mod tests;
