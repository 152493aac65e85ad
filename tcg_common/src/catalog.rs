//! Catalog records owned by the collection database

use serde::{Deserialize, Serialize};

/// A card in the catalog (`pokemon_cards` row with its nested varieties)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CatalogCard {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type", default)]
    pub card_type: Option<String>,
    #[serde(default)]
    pub set_name: Option<String>,
    #[serde(default)]
    pub card_number: Option<String>,
    /// Pokemon TCG API id, attached once the card has been matched
    #[serde(rename = "tcg_player_id", default)]
    pub external_id: Option<String>,
    #[serde(rename = "card_varieties", default)]
    pub varieties: Vec<Variety>,
}

/// A specific printing/finish of a catalog card (`card_varieties` row)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Variety {
    pub id: i64,
    #[serde(default)]
    pub card_id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub rarity: Option<String>,
    #[serde(default)]
    pub market_value: Option<f64>,
}

impl CatalogCard {
    /// Set name, if one is recorded (empty strings count as unknown)
    pub fn set_name(&self) -> Option<&str> {
        non_empty(self.set_name.as_deref())
    }

    /// Numeric part of the card number: "58/102" -> "58"
    pub fn number_prefix(&self) -> Option<&str> {
        let number = non_empty(self.card_number.as_deref())?;
        let prefix = number.split('/').next().unwrap_or(number).trim();
        if prefix.is_empty() {
            None
        } else {
            Some(prefix)
        }
    }
}

impl Variety {
    pub fn rarity(&self) -> &str {
        self.rarity.as_deref().unwrap_or_default()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
