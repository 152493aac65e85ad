use async_trait::async_trait;
use tcg_common::{CardError, CatalogCard, ExternalCardRecord};

use super::dto::SearchResponse;
use super::PricingSource;

/// Public Pokemon TCG API v2 endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.pokemontcg.io/v2";

const PRIMARY_PAGE_SIZE: u32 = 10;
const FALLBACK_PAGE_SIZE: u32 = 5;
const USER_AGENT: &str = "price_updater/1.0";

/// Build the structured search query for a card:
/// `name:"X" set.name:"Y" number:N`, leaving out parts that are unknown.
pub fn build_query(card: &CatalogCard) -> String {
    let mut query = name_query(&card.name);
    if let Some(set_name) = card.set_name() {
        query.push_str(&format!(" set.name:\"{}\"", set_name));
    }
    if let Some(number) = card.number_prefix() {
        query.push_str(&format!(" number:{}", number));
    }
    query
}

fn name_query(name: &str) -> String {
    format!("name:\"{}\"", name)
}

/// Async client for the card search endpoint
#[derive(Clone)]
pub struct PokemonTcgClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl PokemonTcgClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Run one search query and return its records in API order
    pub async fn query(
        &self,
        query: &str,
        page_size: u32,
    ) -> Result<Vec<ExternalCardRecord>, CardError> {
        let url = format!(
            "{}/cards?q={}&pageSize={}",
            self.base_url,
            urlencoding::encode(query),
            page_size
        );

        log::debug!("Searching for card: {}", query);

        let mut request = self
            .client
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .header("Content-Type", "application/json");
        if let Some(key) = &self.api_key {
            request = request.header("X-Api-Key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CardError::SourceUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CardError::SourceUnavailable(status.to_string()));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| CardError::SourceUnavailable(format!("invalid response: {}", e)))?;

        Ok(body.into_records())
    }
}

impl Default for PokemonTcgClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, None)
    }
}

#[async_trait]
impl PricingSource for PokemonTcgClient {
    async fn search(&self, card: &CatalogCard) -> Result<Vec<ExternalCardRecord>, CardError> {
        let records = self.query(&build_query(card), PRIMARY_PAGE_SIZE).await?;
        if !records.is_empty() {
            return Ok(records);
        }

        log::debug!("No results for full query, retrying by name: {}", card.name);
        let records = self
            .query(&name_query(&card.name), FALLBACK_PAGE_SIZE)
            .await?;
        if records.is_empty() {
            log::info!("No matches found for {}", card.name);
        }
        Ok(records)
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
