//! Typed payloads recovered from the assistant's embedded protocol.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::Rarity;

/// Game-relevant facts carried inside an assistant reply.
///
/// Payloads are transient: they exist between extraction and the commit
/// that applies them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind")]
#[ts(export, export_to = "bindings/")]
pub enum ProtocolPayload {
    /// `[NAME=..][RARITY=..][SCORE=..]` tag set.
    Identification {
        /// Specimen name.
        name: String,
        /// Normalized rarity.
        rarity: Rarity,
        /// Declared new total score (may be negative when the assistant misbehaves).
        new_total_score: i64,
    },
    /// `[IDENTIFICATION_JSON={...}]` object.
    IdentificationJson {
        /// Specimen name.
        name: String,
        /// Normalized rarity.
        rarity: Rarity,
        /// Declared new total score.
        new_total_score: i64,
        /// Chemical formula or composition.
        mineral_composition: Option<String>,
        /// Mohs hardness as text.
        hardness: Option<String>,
        /// Formation environment notes.
        geological_context: Option<String>,
    },
    /// `[TRADE_ACCEPTED=true|false]` verdict.
    TradeVerdict {
        /// Whether the counterpart accepted.
        accepted: bool,
    },
}

impl ProtocolPayload {
    /// Returns `true` for both identification forms.
    pub const fn is_identification(&self) -> bool {
        matches!(
            self,
            Self::Identification { .. } | Self::IdentificationJson { .. }
        )
    }

    /// Declared new total for identification payloads.
    pub const fn declared_total(&self) -> Option<i64> {
        match self {
            Self::Identification {
                new_total_score, ..
            }
            | Self::IdentificationJson {
                new_total_score, ..
            } => Some(*new_total_score),
            Self::TradeVerdict { .. } => None,
        }
    }
}
