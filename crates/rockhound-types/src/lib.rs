//! Shared type definitions for `RockHound`.
//!
//! This crate is the single source of truth for the records that flow
//! between the protocol parser, the rule engine, persistence and the web
//! client. Types flow downstream to `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers
//! - [`enums`] -- Rarity, turn phases, ledger categories
//! - [`structs`] -- Journal entries, game state, store items, listings
//! - [`payload`] -- Protocol payloads extracted from assistant replies
//! - [`events`] -- Outbound engine events

pub mod enums;
pub mod events;
pub mod ids;
pub mod payload;
pub mod structs;

pub use enums::{
    DifficultyTier, ErrorKind, MessageAuthor, Rarity, ScoreEntryKind, TurnKind, TurnOutcome,
    TurnPhase,
};
pub use events::EngineEvent;
pub use ids::{JournalEntryId, ListingId, ScoreEntryId, TurnId};
pub use payload::ProtocolPayload;
pub use structs::{
    AchievementStatus, ChatMessage, GameState, GeoPoint, ImageAttachment, JournalEntry,
    LandListing, PointOfInterest, ScoreEntry, StoreItem,
};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // Files are written to `bindings/` relative to the crate root.
        use ts_rs::TS;

        let _ = crate::ids::JournalEntryId::export_all();
        let _ = crate::ids::TurnId::export_all();
        let _ = crate::ids::ScoreEntryId::export_all();
        let _ = crate::ids::ListingId::export_all();

        let _ = crate::enums::Rarity::export_all();
        let _ = crate::enums::DifficultyTier::export_all();
        let _ = crate::enums::ScoreEntryKind::export_all();
        let _ = crate::enums::TurnKind::export_all();
        let _ = crate::enums::TurnPhase::export_all();
        let _ = crate::enums::TurnOutcome::export_all();
        let _ = crate::enums::ErrorKind::export_all();
        let _ = crate::enums::MessageAuthor::export_all();

        let _ = crate::structs::JournalEntry::export_all();
        let _ = crate::structs::ScoreEntry::export_all();
        let _ = crate::structs::StoreItem::export_all();
        let _ = crate::structs::LandListing::export_all();
        let _ = crate::structs::GameState::export_all();
        let _ = crate::structs::GeoPoint::export_all();
        let _ = crate::structs::ImageAttachment::export_all();
        let _ = crate::structs::PointOfInterest::export_all();
        let _ = crate::structs::ChatMessage::export_all();
        let _ = crate::structs::AchievementStatus::export_all();

        let _ = crate::payload::ProtocolPayload::export_all();
        let _ = crate::events::EngineEvent::export_all();
    }
}
