//! Error types for the rockhound-collection crate.
//!
//! Every operation validates before it mutates, so an error always means
//! the game state was left untouched.

use rockhound_ledger::LedgerError;
use rockhound_types::JournalEntryId;

/// Errors from reconciliation, achievements and listings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollectionError {
    /// The payload is not an identification.
    #[error("payload is not an identification")]
    NotAnIdentification,

    /// Recording the score change failed.
    #[error("score ledger rejected the change: {source}")]
    Ledger {
        /// The underlying ledger error.
        #[from]
        source: LedgerError,
    },
}

/// Errors from trade validation and settlement.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TradeError {
    /// The offered specimen is not in the collector's journal.
    #[error("offered specimen {0} is not in the journal")]
    OfferedNotOwned(JournalEntryId),

    /// The requested specimen is not in the counterpart's inventory.
    #[error("requested specimen {0} is not in the trade inventory")]
    RequestedUnavailable(JournalEntryId),

    /// Accepting would push the score below zero.
    #[error("trade would change score {score} by {delta}")]
    Unaffordable {
        /// Current score.
        score: u64,
        /// Score change the trade would apply.
        delta: i64,
    },

    /// Recording the score change failed.
    #[error("score ledger rejected the trade: {source}")]
    Ledger {
        /// The underlying ledger error.
        #[from]
        source: LedgerError,
    },
}

/// Errors from store purchases.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PurchaseError {
    /// No store item has this id.
    #[error("unknown store item: {0}")]
    UnknownItem(String),

    /// The item was bought before.
    #[error("store item already owned: {0}")]
    AlreadyOwned(String),

    /// The score does not cover the price.
    #[error("price {price} exceeds score {score}")]
    InsufficientScore {
        /// Item price.
        price: u64,
        /// Current score.
        score: u64,
    },

    /// Recording the score change failed.
    #[error("score ledger rejected the purchase: {source}")]
    Ledger {
        /// The underlying ledger error.
        #[from]
        source: LedgerError,
    },
}
