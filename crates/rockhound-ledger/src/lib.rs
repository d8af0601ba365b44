//! Append-only score ledger for `RockHound`.
//!
//! Every change to the collector's score is recorded as a
//! [`ScoreEntry`](rockhound_types::ScoreEntry). The score itself is never
//! written directly; it only moves through [`post`] and [`adopt_total`],
//! which append a row and update the balance together.
//!
//! # Architecture
//!
//! - [`entry`] -- The [`ScoreEntryBuilder`] for validated row construction.
//! - [`ledger`] -- Posting rows against a [`GameState`](rockhound_types::GameState).
//! - [`conservation`] -- Verifying that the rows account for the score.
//!
//! # Conservation Law
//!
//! ```text
//! state.score == sum(entry.delta for entry in state.score_ledger)
//! ```
//!
//! and every row's `balance_after` equals the running sum up to that row.
//! A violation produces a [`ScoreAnomaly`]. The ledger never panics; it
//! returns errors.
//!
//! | Kind | Sign of delta |
//! |------|---------------|
//! | Opening | any |
//! | Identification | any |
//! | `AchievementBonus` | positive |
//! | `TradeSettlement` | any |
//! | Purchase | negative |

pub mod conservation;
pub mod entry;
pub mod ledger;

pub use conservation::{ConservationResult, verify};
pub use entry::ScoreEntryBuilder;
pub use ledger::{OpeningBalance, Posting, adopt_total, carry_opening_balance, post};

use rockhound_types::ScoreEntryKind;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when posting score changes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// A row must move the score.
    #[error("score ledger delta must be non-zero")]
    ZeroDelta,

    /// The delta would take the score below zero.
    #[error("delta {delta} would overdraw balance {balance}")]
    Overdraft {
        /// Balance before the change.
        balance: u64,
        /// The rejected delta.
        delta: i64,
    },

    /// The delta has the wrong sign for its kind.
    #[error("{kind:?} rows cannot carry delta {delta}")]
    InvalidSign {
        /// Row category.
        kind: ScoreEntryKind,
        /// The rejected delta.
        delta: i64,
    },

    /// The amount does not fit the ledger's integer range.
    #[error("score amount out of range: {0}")]
    OutOfRange(String),

    /// A required field was not set on the builder.
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

// ---------------------------------------------------------------------------
// Anomaly type
// ---------------------------------------------------------------------------

/// The rows of a ledger do not account for the score they sit next to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreAnomaly {
    /// Score recorded in the state.
    pub score: u64,
    /// Sum of all deltas.
    pub ledger_sum: i128,
    /// Index of the first row whose `balance_after` breaks the running sum.
    pub first_broken_row: Option<usize>,
    /// Human-readable description.
    pub message: String,
}

impl core::fmt::Display for ScoreAnomaly {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.message)
    }
}
