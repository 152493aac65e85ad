//! Chooses the market price for a variety from a matched record's price table

use tcg_common::{CardError, ExternalCardRecord, Finish, PriceQuote, PriceTable, Variety};

/// Pick the quote that applies to `variety`, first rule wins:
///
/// 1. name has "1st edition" and "holo" -> 1st edition holofoil
/// 2. name has "1st edition" -> 1st edition normal
/// 3. rarity or name has "holo" -> holofoil
/// 4. name has "reverse" and a reverse holofoil quote exists -> that quote
/// 5. a normal quote exists -> that quote
/// 6. first quote in the table
///
/// Rules 1-3 commit to their finish even when the table lacks it.
pub fn select_quote<'a>(table: &'a PriceTable, variety: &Variety) -> Option<&'a PriceQuote> {
    let name = variety.name.to_lowercase();
    let rarity = variety.rarity().to_lowercase();

    if name.contains("1st edition") && name.contains("holo") {
        table.get(&Finish::FirstEditionHolofoil)
    } else if name.contains("1st edition") {
        table.get(&Finish::FirstEditionNormal)
    } else if rarity.contains("holo") || name.contains("holo") {
        table.get(&Finish::Holofoil)
    } else if name.contains("reverse") && table.contains(&Finish::ReverseHolofoil) {
        table.get(&Finish::ReverseHolofoil)
    } else if table.contains(&Finish::Normal) {
        table.get(&Finish::Normal)
    } else {
        table.first().map(|(_, quote)| quote)
    }
}

/// Market price for `variety`, or `NoPrice` when there is nothing usable.
///
/// A missing, zero or negative market quote is not a price.
pub fn extract_price(record: &ExternalCardRecord, variety: &Variety) -> Result<f64, CardError> {
    let table = record.price_table.as_ref().ok_or(CardError::NoPrice)?;

    select_quote(table, variety)
        .and_then(|quote| quote.market)
        .filter(|market| *market > 0.0)
        .ok_or(CardError::NoPrice)
}
