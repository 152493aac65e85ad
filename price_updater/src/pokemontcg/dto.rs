//! Response shapes of `GET /v2/cards`

use serde::Deserialize;
use tcg_common::{ExternalCardRecord, PriceTable};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub data: Option<Vec<ApiCard>>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub total_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ApiCard {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub rarity: Option<String>,
    pub set: ApiSet,
    #[serde(default)]
    pub images: Option<ApiImages>,
    #[serde(default)]
    pub tcgplayer: Option<ApiTcgPlayer>,
}

#[derive(Debug, Deserialize)]
pub struct ApiSet {
    pub name: String,
    #[serde(default)]
    pub series: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiImages {
    pub small: Option<String>,
    pub large: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTcgPlayer {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub prices: Option<PriceTable>,
}

impl SearchResponse {
    pub fn into_records(self) -> Vec<ExternalCardRecord> {
        self.data
            .unwrap_or_default()
            .into_iter()
            .map(ExternalCardRecord::from)
            .collect()
    }
}

impl From<ApiCard> for ExternalCardRecord {
    fn from(card: ApiCard) -> Self {
        ExternalCardRecord {
            external_id: card.id,
            name: card.name,
            set_name: card.set.name,
            set_series: card.set.series,
            number: card.number,
            image_url: card.images.and_then(|images| images.large),
            price_table: card.tcgplayer.and_then(|tcg| tcg.prices),
        }
    }
}
