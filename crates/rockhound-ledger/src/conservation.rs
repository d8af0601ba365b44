//! Conservation check: the ledger rows must explain the score.
//!
//! ```text
//! state.score == sum(delta)
//! row[i].balance_after == sum(delta for rows 0..=i)
//! ```
//!
//! [`post`](crate::post) guarantees both by construction; the check guards
//! against corrupted or hand-edited saves.

use rockhound_types::{GameState, ScoreEntry};

use crate::{LedgerError, ScoreAnomaly};

/// Result of a conservation check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConservationResult {
    /// The ledger accounts for the score.
    Balanced,
    /// The ledger and the score disagree.
    Anomaly(ScoreAnomaly),
}

/// Sum of every delta in `entries`.
pub(crate) fn ledger_sum(entries: &[ScoreEntry]) -> Result<i128, LedgerError> {
    entries.iter().try_fold(0_i128, |acc, entry| {
        acc.checked_add(i128::from(entry.delta))
            .ok_or_else(|| LedgerError::OutOfRange("ledger sum overflow".to_owned()))
    })
}

/// Verify that the state's ledger accounts for its score.
pub fn verify(state: &GameState) -> ConservationResult {
    let mut running: i128 = 0;
    let mut first_broken_row = None;

    for (index, entry) in state.score_ledger.iter().enumerate() {
        running = running.saturating_add(i128::from(entry.delta));
        if first_broken_row.is_none() && running != i128::from(entry.balance_after) {
            first_broken_row = Some(index);
        }
    }

    let score = i128::from(state.score);
    if running == score && first_broken_row.is_none() {
        return ConservationResult::Balanced;
    }

    let message = first_broken_row.map_or_else(
        || format!("score {score} but ledger sums to {running}"),
        |row| format!("score {score}, ledger sums to {running}, running balance breaks at row {row}"),
    );
    ConservationResult::Anomaly(ScoreAnomaly {
        score: state.score,
        ledger_sum: running,
        first_broken_row,
        message,
    })
}
