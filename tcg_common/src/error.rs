//! Per-card error taxonomy
//!
//! Every variant is recoverable at the card boundary: the updater counts it,
//! records a one-line summary and moves on to the next card.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CardError {
    /// Pricing API request failed or returned a non-success status
    #[error("Pokemon TCG API request failed: {0}")]
    SourceUnavailable(String),
    /// Search produced no candidates to choose from
    #[error("No suitable card match found")]
    NoMatch,
    /// Matched, but no usable market quote for the variety
    #[error("No suitable price found")]
    NoPrice,
    /// Writing the new price back to the catalog failed
    #[error("Failed to persist price: {0}")]
    Store(String),
}
