//! Core records of the game: journal entries, the persisted game state,
//! score ledger rows, store items, land listings and conversation messages.
//!
//! Persisted records use camelCase keys so saved state stays readable by
//! the web client.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::enums::{MessageAuthor, Rarity, ScoreEntryKind};
use crate::ids::{JournalEntryId, ListingId, ScoreEntryId};

// ---------------------------------------------------------------------------
// Journal
// ---------------------------------------------------------------------------

/// One identified specimen in a collection.
///
/// Entries are created once and never edited. The awarded `score` is fixed
/// at creation; a trade may move the whole entry between collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct JournalEntry {
    /// Unique entry identifier.
    pub id: JournalEntryId,
    /// Specimen name as declared by the assistant.
    pub name: String,
    /// Assistant reply with protocol markup removed.
    pub description: String,
    /// Points credited when the entry was created.
    pub score: u64,
    /// Creation timestamp.
    pub date: DateTime<Utc>,
    /// Normalized rarity tier.
    pub rarity: Rarity,
    /// Reference to the captured image, owned by the client.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Chemical formula or composition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mineral_composition: Option<String>,
    /// Mohs hardness, kept as text (`"7"`, `"5.5-6"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardness: Option<String>,
    /// Formation environment notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geological_context: Option<String>,
}

// ---------------------------------------------------------------------------
// Score ledger
// ---------------------------------------------------------------------------

/// A single append-only record of a score change.
///
/// The sum of every `delta` in the ledger equals the current score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct ScoreEntry {
    /// Unique row identifier.
    pub id: ScoreEntryId,
    /// Category of the change.
    pub kind: ScoreEntryKind,
    /// Signed change applied to the score (never zero).
    pub delta: i64,
    /// Score after this row was applied.
    pub balance_after: u64,
    /// Human-readable reason.
    pub reason: String,
    /// Related record such as a journal entry.
    #[serde(default)]
    pub reference_id: Option<Uuid>,
    /// When the change was committed.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Store and listings
// ---------------------------------------------------------------------------

/// Item sold in the in-game store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StoreItem {
    /// Stable catalog identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Marketing copy.
    pub description: String,
    /// Price in score points.
    pub price: u64,
    /// Emoji shown next to the item.
    pub icon: String,
}

/// Land owner's offer of collecting access to a property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct LandListing {
    /// Unique listing identifier.
    pub id: ListingId,
    /// Property name.
    pub property_name: String,
    /// Owner's name.
    pub land_owner_name: String,
    /// Free-text location.
    pub location: String,
    /// Access fee in dollars.
    pub fee: u64,
    /// Minerals known to occur on the property.
    #[serde(default)]
    pub minerals_known: Vec<String>,
    /// Rules visitors must follow.
    #[serde(default)]
    pub access_rules: String,
    /// Anything else worth knowing.
    #[serde(default)]
    pub additional_notes: String,
    /// Optional photo reference.
    #[serde(default)]
    pub image_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Game state
// ---------------------------------------------------------------------------

/// Full persisted game state.
///
/// The engine host owns the only mutable copy. Sets are serialized as
/// arrays of ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct GameState {
    /// Current score. Equals the sum of all ledger deltas.
    #[serde(default)]
    pub score: u64,
    /// Collection journal, newest first.
    #[serde(default)]
    pub journal_entries: Vec<JournalEntry>,
    /// Ids of achievements already unlocked.
    #[serde(default)]
    pub unlocked_achievements: BTreeSet<String>,
    /// Ids of store items already bought.
    #[serde(default)]
    pub purchased_items: BTreeSet<String>,
    /// Land listings, newest first.
    #[serde(default)]
    pub listings: Vec<LandListing>,
    /// The trade counterpart's inventory.
    #[serde(default)]
    pub trade_inventory: BTreeMap<JournalEntryId, JournalEntry>,
    /// Append-only record of every score change.
    #[serde(default)]
    pub score_ledger: Vec<ScoreEntry>,
}

impl GameState {
    /// Look up a journal entry by id.
    pub fn journal_entry(&self, id: JournalEntryId) -> Option<&JournalEntry> {
        self.journal_entries.iter().find(|entry| entry.id == id)
    }
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// Latitude/longitude pair reported by the client.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GeoPoint {
    /// Degrees north.
    pub latitude: f64,
    /// Degrees east.
    pub longitude: f64,
}

/// Image attached to a chat message, already base64 encoded by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct ImageAttachment {
    /// MIME type such as `image/jpeg`.
    pub mime_type: String,
    /// Base64 payload without the `data:` prefix.
    pub data: String,
}

impl ImageAttachment {
    /// Render the attachment as a `data:` URL.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// Point of interest the collector wants investigated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PointOfInterest {
    /// Name the collector gave the spot.
    pub name: String,
    /// Optional notes about what was seen there.
    #[serde(default)]
    pub description: Option<String>,
    /// Where it is.
    pub location: GeoPoint,
}

/// One visible message in the conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct ChatMessage {
    /// Who wrote it.
    pub author: MessageAuthor,
    /// Display text.
    pub text: String,
    /// Attached image, if any.
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Achievement definition joined with its unlock status, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AchievementStatus {
    /// Stable rule id.
    pub id: String,
    /// Display title.
    pub title: String,
    /// What it takes.
    pub description: String,
    /// Points granted on unlock.
    pub reward: u64,
    /// Whether it has been unlocked.
    pub unlocked: bool,
}
