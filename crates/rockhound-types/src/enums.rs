//! Enumeration types for the `RockHound` game.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Rarity
// ---------------------------------------------------------------------------

/// Rarity tier of an identified specimen.
///
/// The assistant declares rarity as a free-text token. Anything outside the
/// five known tiers is carried as [`Rarity::Unknown`] instead of failing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub enum Rarity {
    /// Everyday finds.
    Common,
    /// Somewhat scarce finds.
    Uncommon,
    /// Hard to come by.
    Rare,
    /// Exceptional specimens.
    Epic,
    /// Once-in-a-lifetime specimens.
    Legendary,
    /// Token outside the known tiers.
    #[default]
    Unknown,
}

impl Rarity {
    /// The five tiers the assistant is allowed to declare.
    pub const KNOWN: [Self; 5] = [
        Self::Common,
        Self::Uncommon,
        Self::Rare,
        Self::Epic,
        Self::Legendary,
    ];

    /// Normalize a declared rarity token.
    ///
    /// Exact matches win; otherwise a case-insensitive match on the trimmed
    /// token is tried before falling back to [`Rarity::Unknown`].
    pub fn from_token(token: &str) -> Self {
        if let Some(exact) = Self::KNOWN.iter().find(|r| r.as_str() == token) {
            return *exact;
        }
        let trimmed = token.trim();
        Self::KNOWN
            .iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(trimmed))
            .copied()
            .unwrap_or(Self::Unknown)
    }

    /// Canonical display name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Common => "Common",
            Self::Uncommon => "Uncommon",
            Self::Rare => "Rare",
            Self::Epic => "Epic",
            Self::Legendary => "Legendary",
            Self::Unknown => "Unknown",
        }
    }

    /// Base points awarded for a find in nature, before context multipliers.
    pub const fn base_points(self) -> u64 {
        match self {
            Self::Common => 5,
            Self::Uncommon => 15,
            Self::Rare => 50,
            Self::Epic => 150,
            Self::Legendary => 500,
            Self::Unknown => 0,
        }
    }
}

impl core::fmt::Display for Rarity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Difficulty
// ---------------------------------------------------------------------------

/// Challenge difficulty derived from the collector's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum DifficultyTier {
    /// Score below 500.
    Beginner,
    /// Score from 500 through 2500.
    Intermediate,
    /// Score above 2500.
    Expert,
}

impl DifficultyTier {
    /// Select the tier for a score.
    pub const fn for_score(score: u64) -> Self {
        if score < 500 {
            Self::Beginner
        } else if score <= 2500 {
            Self::Intermediate
        } else {
            Self::Expert
        }
    }
}

// ---------------------------------------------------------------------------
// Score ledger
// ---------------------------------------------------------------------------

/// Category of a score ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum ScoreEntryKind {
    /// Balance carried in from state saved before the ledger existed.
    Opening,
    /// Declared total adopted from an identification.
    Identification,
    /// Reward for a batch of newly unlocked achievements.
    AchievementBonus,
    /// Value difference of an accepted trade.
    TradeSettlement,
    /// Store item price deducted.
    Purchase,
}

// ---------------------------------------------------------------------------
// Turns
// ---------------------------------------------------------------------------

/// What an assistant turn was started for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum TurnKind {
    /// Free conversation, possibly with images to identify.
    Chat,
    /// Request for a location-based challenge.
    Challenge,
    /// Investigation of a point of interest.
    Investigation,
    /// Evaluation of a trade proposal.
    Trade,
}

/// Phase of the per-turn state machine.
///
/// ```text
/// Idle -> Streaming -> Extracting -> ReconcilingIdentification -> EvaluatingAchievements -> Idle
///                                 -> SettlingTrade             ->
///                                 -> NoPayload                 -> Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum TurnPhase {
    /// No turn in flight.
    Idle,
    /// Consuming assistant fragments.
    Streaming,
    /// Running the final extraction over the complete transcript.
    Extracting,
    /// Applying an identification payload.
    ReconcilingIdentification,
    /// Applying a trade verdict.
    SettlingTrade,
    /// Plain conversational reply, nothing to apply.
    NoPayload,
    /// Checking achievement rules against the committed state.
    EvaluatingAchievements,
}

/// How a turn finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum TurnOutcome {
    /// State mutations were committed.
    Committed,
    /// The reply carried nothing to apply, or a trade was declined.
    NoChange,
    /// The transport failed and the turn was rolled back.
    Failed,
    /// The turn was cancelled and rolled back.
    Cancelled,
}

/// Classification of user-facing error notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum ErrorKind {
    /// Stream aborted or location unavailable.
    Transport,
    /// The reply carried a protocol payload that could not be parsed.
    MalformedPayload,
    /// Saving state failed.
    Persistence,
    /// The request was rejected before any work started.
    Rejected,
}

/// Author of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum MessageAuthor {
    /// The collector.
    User,
    /// The assistant persona.
    Assistant,
}
