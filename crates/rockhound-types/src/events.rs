//! Outbound notifications the engine broadcasts to every client.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{ErrorKind, TurnKind, TurnOutcome, TurnPhase};
use crate::ids::TurnId;
use crate::payload::ProtocolPayload;
use crate::structs::{JournalEntry, LandListing};

/// Event emitted by the game engine.
///
/// Per-turn events carry the [`TurnId`] so clients can ignore stragglers
/// from an older turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum EngineEvent {
    /// A turn was accepted and is streaming.
    TurnStarted {
        /// Turn identifier.
        turn_id: TurnId,
        /// What the turn is for.
        kind: TurnKind,
    },
    /// The turn state machine moved.
    PhaseChanged {
        /// Turn identifier.
        turn_id: TurnId,
        /// New phase.
        phase: TurnPhase,
    },
    /// Display text after the latest fragment, markup stripped.
    DisplayText {
        /// Turn identifier.
        turn_id: TurnId,
        /// Full display text so far.
        text: String,
    },
    /// A complete payload became visible in the stream for the first time.
    PayloadDetected {
        /// Turn identifier.
        turn_id: TurnId,
        /// The payload as currently extracted.
        payload: ProtocolPayload,
    },
    /// An identification was committed.
    JournalEntryCreated {
        /// Turn identifier.
        turn_id: TurnId,
        /// The new entry.
        entry: Box<JournalEntry>,
        /// Score after the commit.
        score: u64,
    },
    /// A trade verdict was applied.
    TradeVerdict {
        /// Turn identifier.
        turn_id: TurnId,
        /// Whether the counterpart accepted.
        accepted: bool,
        /// The counterpart's reasoning with the verdict tag removed.
        rationale: String,
        /// Score change applied (zero on decline).
        score_delta: i64,
    },
    /// A batch of achievements unlocked together.
    AchievementsUnlocked {
        /// Rule ids in evaluation order.
        ids: Vec<String>,
        /// Sum of their rewards.
        bonus: u64,
        /// Score after the bonus.
        score: u64,
    },
    /// A store item was bought.
    ItemPurchased {
        /// Catalog id.
        item_id: String,
        /// Price deducted.
        price: u64,
        /// Score after the purchase.
        score: u64,
    },
    /// A land listing was published.
    ListingCreated {
        /// The new listing.
        listing: Box<LandListing>,
    },
    /// User-facing error notice.
    Error {
        /// Turn identifier, when the error belongs to a turn.
        turn_id: Option<TurnId>,
        /// Error class.
        kind: ErrorKind,
        /// Message to show.
        message: String,
    },
    /// The turn is over and the engine is idle again.
    TurnEnded {
        /// Turn identifier.
        turn_id: TurnId,
        /// How it finished.
        outcome: TurnOutcome,
    },
}
