//! The seam between the turn engine and the generative assistant.
//!
//! The engine treats the assistant as an opaque "send prompt, receive text
//! stream" service. Each turn is described as a typed [`TurnRequest`]; the
//! transport owns prompt rendering, the wire format and any authentication.
//! Fragments may be split at arbitrary character boundaries.

use futures::stream::BoxStream;
use rockhound_types::{
    ChatMessage, DifficultyTier, GeoPoint, ImageAttachment, JournalEntry, PointOfInterest,
};
use serde::Serialize;

/// Errors a transport can yield mid-stream or before the first fragment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The backend could not be reached.
    #[error("assistant unreachable: {0}")]
    Unreachable(String),

    /// The backend answered with a non-success status.
    #[error("assistant returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// The stream broke off.
    #[error("assistant stream aborted: {0}")]
    Aborted(String),

    /// The request could not be rendered or encoded.
    #[error("assistant request invalid: {0}")]
    Request(String),
}

/// What the collector wants from the assistant this turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnRequest {
    /// Free text, optionally with specimen photos.
    Chat {
        /// What the collector typed.
        text: String,
        /// Attached photos.
        images: Vec<ImageAttachment>,
        /// Current position, when known.
        location: Option<GeoPoint>,
        /// Score before the turn.
        score: u64,
        /// Difficulty tier for the score.
        tier: DifficultyTier,
    },
    /// A location-based scavenger challenge.
    Challenge {
        /// Current position, when known.
        location: Option<GeoPoint>,
        /// Score before the turn.
        score: u64,
        /// Difficulty tier for the score.
        tier: DifficultyTier,
    },
    /// A survey of a point of interest on the map.
    Investigation {
        /// The spot to investigate.
        point_of_interest: PointOfInterest,
        /// Current position, when known.
        location: Option<GeoPoint>,
        /// Score before the turn.
        score: u64,
    },
    /// Ask the counterpart to accept or decline a swap.
    TradeEvaluation {
        /// The collector's entry on offer.
        offered: JournalEntry,
        /// The counterpart's entry asked for.
        requested: JournalEntry,
        /// Score before the turn.
        score: u64,
    },
}

impl TurnRequest {
    /// The collector's location, if the request carries one.
    pub const fn location(&self) -> Option<GeoPoint> {
        match self {
            Self::Chat { location, .. }
            | Self::Challenge { location, .. }
            | Self::Investigation { location, .. } => *location,
            Self::TradeEvaluation { .. } => None,
        }
    }

    /// Whether the turn's prompt is built around the collector's position.
    pub const fn needs_location(&self) -> bool {
        matches!(self, Self::Chat { .. } | Self::Challenge { .. })
    }
}

/// Stream of reply fragments.
pub type ReplyStream = BoxStream<'static, Result<String, TransportError>>;

/// A generative assistant that streams its reply as text fragments.
///
/// `history` is the visible conversation before this turn, oldest first.
pub trait AssistantTransport: Send + Sync {
    /// Start a reply. Errors may surface as the first stream item.
    fn stream_reply(&self, request: TurnRequest, history: Vec<ChatMessage>) -> ReplyStream;
}
