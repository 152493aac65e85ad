//! Picks the search result that corresponds to a catalog card

use tcg_common::{CardError, CatalogCard, ExternalCardRecord};

/// Which precedence rule produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchConfidence {
    /// Name and set both agree
    NameAndSet,
    /// Name agrees, set does not (or is unknown)
    Name,
    /// Nothing agrees; first result taken as a best effort
    Fallback,
}

#[derive(Debug, Clone, Copy)]
pub struct CardMatch<'a> {
    pub record: &'a ExternalCardRecord,
    pub confidence: MatchConfidence,
}

/// Select one candidate for `card`.
///
/// 1. name matches and the candidate's set name contains the card's set name
/// 2. first candidate whose name matches
/// 3. first candidate
///
/// Comparisons are case-insensitive. Fails only when `candidates` is empty.
pub fn resolve_match<'a>(
    card: &CatalogCard,
    candidates: &'a [ExternalCardRecord],
) -> Result<CardMatch<'a>, CardError> {
    let name = card.name.to_lowercase();
    let set_name = card.set_name().map(str::to_lowercase);

    let mut name_match = None;
    for candidate in candidates {
        if candidate.name.to_lowercase() != name {
            continue;
        }
        if let Some(set_name) = &set_name {
            if candidate.set_name.to_lowercase().contains(set_name.as_str()) {
                return Ok(CardMatch {
                    record: candidate,
                    confidence: MatchConfidence::NameAndSet,
                });
            }
        }
        if name_match.is_none() {
            name_match = Some(candidate);
        }
    }

    if let Some(record) = name_match {
        return Ok(CardMatch {
            record,
            confidence: MatchConfidence::Name,
        });
    }

    candidates
        .first()
        .map(|record| CardMatch {
            record,
            confidence: MatchConfidence::Fallback,
        })
        .ok_or(CardError::NoMatch)
}
