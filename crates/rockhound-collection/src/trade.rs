//! Specimen trades with the assistant's counterpart collection.
//!
//! A trade is one of the collector's journal entries for one entry from
//! the counterpart's inventory. The lifecycle is:
//!
//! 1. [`quote`] -- validate the proposal and compute the score delta.
//! 2. The assistant evaluates the proposal and replies with a verdict tag.
//! 3. [`settle`] -- on acceptance, swap both entries and post the delta as
//!    one unit; on decline, change nothing.
//!
//! # Ledger Integration
//!
//! The collector's score changes by exactly `requested.score - offered.score`.
//! A proposal that would drive the score below zero is refused at the quote
//! stage, before the assistant is consulted.

use rockhound_ledger::{Posting, post};
use rockhound_types::{GameState, JournalEntry, JournalEntryId, ScoreEntryKind};
use tracing::info;

use crate::error::TradeError;

/// The collector offers one entry in exchange for one counterpart entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeProposal {
    /// Entry from the collector's journal.
    pub offered: JournalEntryId,
    /// Entry from the counterpart's inventory.
    pub requested: JournalEntryId,
}

/// A validated proposal with both entries resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeQuote {
    /// The collector's entry.
    pub offered: JournalEntry,
    /// The counterpart's entry.
    pub requested: JournalEntry,
    /// Score change if accepted.
    pub score_delta: i64,
}

/// What a settlement did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    /// Whether the trade went through.
    pub accepted: bool,
    /// Score change applied (zero on decline).
    pub score_delta: i64,
}

/// Validate a proposal against the current state. No mutations occur.
pub fn quote(state: &GameState, proposal: TradeProposal) -> Result<TradeQuote, TradeError> {
    let offered = state
        .journal_entry(proposal.offered)
        .ok_or(TradeError::OfferedNotOwned(proposal.offered))?;
    let requested = state
        .trade_inventory
        .get(&proposal.requested)
        .ok_or(TradeError::RequestedUnavailable(proposal.requested))?;

    let score_delta = score_delta(offered, requested)?;
    if state.score.checked_add_signed(score_delta).is_none() {
        return Err(TradeError::Unaffordable {
            score: state.score,
            delta: score_delta,
        });
    }

    Ok(TradeQuote {
        offered: offered.clone(),
        requested: requested.clone(),
        score_delta,
    })
}

/// Apply the counterpart's verdict.
///
/// The proposal is re-validated against `state` before anything moves, so
/// a stale proposal fails cleanly.
pub fn settle(
    state: &mut GameState,
    proposal: TradeProposal,
    accepted: bool,
) -> Result<Settlement, TradeError> {
    if !accepted {
        info!(
            offered = %proposal.offered,
            requested = %proposal.requested,
            "trade declined"
        );
        return Ok(Settlement {
            accepted: false,
            score_delta: 0,
        });
    }

    let validated = quote(state, proposal)?;

    // Post first: the only step that can fail.
    if validated.score_delta != 0 {
        post(
            state,
            Posting {
                kind: ScoreEntryKind::TradeSettlement,
                delta: validated.score_delta,
                reason: format!("traded {} for {}", validated.offered.name, validated.requested.name),
                reference_id: Some(validated.requested.id.into_inner()),
            },
        )?;
    }

    state.journal_entries.retain(|entry| entry.id != proposal.offered);
    state.trade_inventory.remove(&proposal.requested);
    state.journal_entries.insert(0, validated.requested.clone());
    state
        .trade_inventory
        .insert(validated.offered.id, validated.offered.clone());

    info!(
        offered = %validated.offered.name,
        requested = %validated.requested.name,
        score_delta = validated.score_delta,
        score = state.score,
        "trade settled"
    );
    Ok(Settlement {
        accepted: true,
        score_delta: validated.score_delta,
    })
}

fn score_delta(offered: &JournalEntry, requested: &JournalEntry) -> Result<i64, TradeError> {
    let delta = i128::from(requested.score)
        .checked_sub(i128::from(offered.score))
        .unwrap_or_default();
    i64::try_from(delta).map_err(|e| {
        TradeError::from(rockhound_ledger::LedgerError::OutOfRange(e.to_string()))
    })
}
