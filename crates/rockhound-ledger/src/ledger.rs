//! Posting score changes against a game state.
//!
//! The score and the ledger always move together: a row is appended and
//! `state.score` becomes that row's `balance_after` in the same call.

use rockhound_types::{GameState, ScoreEntry, ScoreEntryId, ScoreEntryKind};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::conservation::ledger_sum;
use crate::{ConservationResult, LedgerError, ScoreAnomaly, ScoreEntryBuilder, verify};

/// A score change to record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    /// Row category.
    pub kind: ScoreEntryKind,
    /// Signed change.
    pub delta: i64,
    /// Human-readable reason.
    pub reason: String,
    /// Related record, if any.
    pub reference_id: Option<Uuid>,
}

/// Append a row for `posting` and move the score.
///
/// Nothing changes if the row fails validation.
pub fn post(state: &mut GameState, posting: Posting) -> Result<ScoreEntry, LedgerError> {
    let mut builder = ScoreEntryBuilder::new(posting.kind, state.score)
        .delta(posting.delta)
        .reason(posting.reason);
    if let Some(reference) = posting.reference_id {
        builder = builder.reference_id(reference);
    }
    let entry = builder.build()?;

    debug!(
        kind = ?entry.kind,
        delta = entry.delta,
        balance_after = entry.balance_after,
        "score ledger row posted"
    );
    state.score = entry.balance_after;
    state.score_ledger.push(entry.clone());
    Ok(entry)
}

/// Move the score to `target`, recording the difference.
///
/// Returns `Ok(None)` when the score already equals `target`.
pub fn adopt_total(
    state: &mut GameState,
    target: u64,
    kind: ScoreEntryKind,
    reason: String,
    reference_id: Option<Uuid>,
) -> Result<Option<ScoreEntry>, LedgerError> {
    let delta = signed_difference(target, state.score)?;
    if delta == 0 {
        return Ok(None);
    }
    post(
        state,
        Posting {
            kind,
            delta,
            reason,
            reference_id,
        },
    )
    .map(Some)
}

/// What [`carry_opening_balance`] did to a loaded ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpeningBalance {
    /// The rows already account for the score.
    Balanced,
    /// An opening row for the unexplained difference was appended.
    Carried(ScoreEntry),
    /// The running balance was broken, so the rows were replaced by a single
    /// opening row for the saved score.
    Rebased {
        /// Rows dropped.
        discarded: usize,
    },
}

/// Make the ledger account for the score of a loaded state.
///
/// State saved before the ledger existed (or edited by hand) may carry a
/// score its rows do not explain. An [`ScoreEntryKind::Opening`] row for the
/// difference is appended; the score itself is left alone. Rows whose
/// running balance no longer chains (a row went missing, say) cannot be
/// repaired one by one and are replaced by one opening row.
pub fn carry_opening_balance(state: &mut GameState) -> Result<OpeningBalance, LedgerError> {
    if let ConservationResult::Anomaly(ScoreAnomaly {
        first_broken_row: Some(row),
        ..
    }) = verify(state)
    {
        let discarded = state.score_ledger.len();
        warn!(
            score = state.score,
            first_broken_row = row,
            discarded,
            "ledger running balance broken, rebasing on the saved score"
        );
        let delta =
            i64::try_from(state.score).map_err(|e| LedgerError::OutOfRange(e.to_string()))?;
        state.score_ledger.clear();
        if delta != 0 {
            state.score_ledger.push(opening_row(delta, state.score));
        }
        return Ok(OpeningBalance::Rebased { discarded });
    }

    let sum = ledger_sum(&state.score_ledger)?;
    let difference = i128::from(state.score)
        .checked_sub(sum)
        .ok_or_else(|| LedgerError::OutOfRange(format!("{} - {sum}", state.score)))?;
    if difference == 0 {
        return Ok(OpeningBalance::Balanced);
    }
    let delta =
        i64::try_from(difference).map_err(|e| LedgerError::OutOfRange(e.to_string()))?;

    warn!(
        score = state.score,
        ledger_sum = %sum,
        delta,
        "score not accounted for by ledger, carrying opening balance"
    );
    let entry = opening_row(delta, state.score);
    state.score_ledger.push(entry.clone());
    Ok(OpeningBalance::Carried(entry))
}

fn opening_row(delta: i64, balance_after: u64) -> ScoreEntry {
    ScoreEntry {
        id: ScoreEntryId::new(),
        kind: ScoreEntryKind::Opening,
        delta,
        balance_after,
        reason: "opening balance".to_owned(),
        reference_id: None,
        created_at: chrono::Utc::now(),
    }
}

fn signed_difference(target: u64, current: u64) -> Result<i64, LedgerError> {
    let difference = i128::from(target)
        .checked_sub(i128::from(current))
        .ok_or_else(|| LedgerError::OutOfRange(format!("{target} - {current}")))?;
    i64::try_from(difference).map_err(|e| LedgerError::OutOfRange(e.to_string()))
}
