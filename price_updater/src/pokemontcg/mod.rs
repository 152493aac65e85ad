//! Pokemon TCG API client for card search and TCGplayer prices

mod client;
mod dto;

pub use client::{build_query, PokemonTcgClient, DEFAULT_BASE_URL};
pub use dto::{ApiCard, SearchResponse};

use async_trait::async_trait;
use tcg_common::{CardError, CatalogCard, ExternalCardRecord};

/// Source of candidate records for a catalog card
#[async_trait]
pub trait PricingSource: Send + Sync {
    /// Search for a card, falling back to a name-only query once when the
    /// full query has no hits. An empty result is not an error.
    async fn search(&self, card: &CatalogCard) -> Result<Vec<ExternalCardRecord>, CardError>;
}
