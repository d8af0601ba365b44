//! Turning an identification payload into a journal entry and a score.
//!
//! The assistant declares the collector's *new total* rather than the
//! points for the find. The entry's own score is the difference from the
//! prior total, clamped at zero; the declared total is adopted as the new
//! score either way.

use chrono::Utc;
use rockhound_ledger::adopt_total;
use rockhound_types::{
    GameState, JournalEntry, JournalEntryId, ProtocolPayload, ScoreEntry, ScoreEntryKind,
};
use tracing::{info, warn};

use crate::error::CollectionError;

/// Outcome of reconciling one identification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// The entry to prepend to the journal.
    pub entry: JournalEntry,
    /// Score before the identification.
    pub prior_score: u64,
    /// Score after the identification (the declared total, floored at zero).
    pub new_score: u64,
}

/// Build the journal entry and new score for an identification payload.
///
/// Pure: nothing is recorded until [`commit`] is called. Every entry
/// carries the photo it was identified from.
pub fn reconcile(
    payload: &ProtocolPayload,
    prior_score: u64,
    description: &str,
    image_url: &str,
) -> Result<Reconciliation, CollectionError> {
    let (name, rarity, declared, mineral_composition, hardness, geological_context) = match payload
    {
        ProtocolPayload::Identification {
            name,
            rarity,
            new_total_score,
        } => (name, *rarity, *new_total_score, None, None, None),
        ProtocolPayload::IdentificationJson {
            name,
            rarity,
            new_total_score,
            mineral_composition,
            hardness,
            geological_context,
        } => (
            name,
            *rarity,
            *new_total_score,
            mineral_composition.clone(),
            hardness.clone(),
            geological_context.clone(),
        ),
        ProtocolPayload::TradeVerdict { .. } => return Err(CollectionError::NotAnIdentification),
    };

    let new_score = u64::try_from(declared).unwrap_or_else(|_| {
        warn!(declared, "negative score declared, flooring at zero");
        0
    });
    let awarded = new_score.saturating_sub(prior_score);

    Ok(Reconciliation {
        entry: JournalEntry {
            id: JournalEntryId::new(),
            name: name.clone(),
            description: description.to_owned(),
            score: awarded,
            date: Utc::now(),
            rarity,
            image_url: Some(image_url.to_owned()),
            mineral_composition,
            hardness,
            geological_context,
        },
        prior_score,
        new_score,
    })
}

/// Prepend the entry and move the score to the declared total.
///
/// Returns the ledger row, or `None` when the declared total equals the
/// prior score.
pub fn commit(
    state: &mut GameState,
    reconciliation: &Reconciliation,
) -> Result<Option<ScoreEntry>, CollectionError> {
    let entry = &reconciliation.entry;
    let row = adopt_total(
        state,
        reconciliation.new_score,
        ScoreEntryKind::Identification,
        format!("identified {}", entry.name),
        Some(entry.id.into_inner()),
    )?;
    state.journal_entries.insert(0, entry.clone());

    info!(
        entry_id = %entry.id,
        name = %entry.name,
        rarity = %entry.rarity,
        awarded = entry.score,
        score = state.score,
        "journal entry created"
    );
    Ok(row)
}
