//! Pokemon TCG API search results and their TCGplayer price tables

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A search result from the pricing source
///
/// Fetched fresh on every run and never persisted as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalCardRecord {
    pub external_id: String,
    pub name: String,
    pub set_name: String,
    pub set_series: String,
    pub number: String,
    pub image_url: Option<String>,
    pub price_table: Option<PriceTable>,
}

/// Print finish used as a key into a price table
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Finish {
    Holofoil,
    ReverseHolofoil,
    Normal,
    FirstEditionHolofoil,
    FirstEditionNormal,
    /// Any key the API returns that we have no dedicated rule for
    Other(String),
}

impl Finish {
    pub fn from_key(key: &str) -> Self {
        match key {
            "holofoil" => Finish::Holofoil,
            "reverseHolofoil" => Finish::ReverseHolofoil,
            "normal" => Finish::Normal,
            "1stEditionHolofoil" => Finish::FirstEditionHolofoil,
            "1stEditionNormal" => Finish::FirstEditionNormal,
            other => Finish::Other(other.to_string()),
        }
    }

    /// Key as it appears in the API's `tcgplayer.prices` object
    pub fn key(&self) -> &str {
        match self {
            Finish::Holofoil => "holofoil",
            Finish::ReverseHolofoil => "reverseHolofoil",
            Finish::Normal => "normal",
            Finish::FirstEditionHolofoil => "1stEditionHolofoil",
            Finish::FirstEditionNormal => "1stEditionNormal",
            Finish::Other(key) => key,
        }
    }
}

/// Quote bundle for one finish (USD)
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
pub struct PriceQuote {
    #[serde(default)]
    pub low: Option<f64>,
    #[serde(default)]
    pub mid: Option<f64>,
    #[serde(default)]
    pub high: Option<f64>,
    #[serde(default)]
    pub market: Option<f64>,
    #[serde(rename = "directLow", default)]
    pub direct_low: Option<f64>,
}

impl PriceQuote {
    pub fn with_market(market: f64) -> Self {
        Self {
            market: Some(market),
            ..Self::default()
        }
    }
}

/// Finish -> quote mapping, kept in the order the API listed it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceTable {
    entries: Vec<(Finish, PriceQuote)>,
}

impl PriceTable {
    pub fn get(&self, finish: &Finish) -> Option<&PriceQuote> {
        self.entries
            .iter()
            .find(|(key, _)| key == finish)
            .map(|(_, quote)| quote)
    }

    pub fn contains(&self, finish: &Finish) -> bool {
        self.get(finish).is_some()
    }

    /// First quote in iteration order
    pub fn first(&self) -> Option<(&Finish, &PriceQuote)> {
        self.entries.first().map(|(finish, quote)| (finish, quote))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Finish, &PriceQuote)> {
        self.entries.iter().map(|(finish, quote)| (finish, quote))
    }
}

impl FromIterator<(Finish, PriceQuote)> for PriceTable {
    /// Later duplicates of a finish replace the earlier quote in place.
    fn from_iter<I: IntoIterator<Item = (Finish, PriceQuote)>>(iter: I) -> Self {
        let mut table = PriceTable::default();
        for (finish, quote) in iter {
            match table.entries.iter_mut().find(|(key, _)| *key == finish) {
                Some(entry) => entry.1 = quote,
                None => table.entries.push((finish, quote)),
            }
        }
        table
    }
}

// serde_json's Map sorts keys unless `preserve_order` is on, so the table is
// read straight off the map visitor to keep document order.
impl<'de> Deserialize<'de> for PriceTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = PriceTable;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of finish keys to price quotes")
            }

            fn visit_map<A>(self, mut map: A) -> Result<PriceTable, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, quote)) = map.next_entry::<String, Option<PriceQuote>>()? {
                    // a finish listed as null carries no quote at all
                    if let Some(quote) = quote {
                        entries.push((Finish::from_key(&key), quote));
                    }
                }
                Ok(entries.into_iter().collect())
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}
