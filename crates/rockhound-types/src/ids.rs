//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Every record the game creates carries a strongly-typed ID so journal
//! entries, ledger rows and listings cannot be mixed up at compile time.
//! All IDs use UUID v7, which embeds the generation timestamp and sorts in
//! creation order.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }

            /// Parse an identifier from its hyphenated string form.
            pub fn parse(raw: &str) -> Option<Self> {
                Uuid::parse_str(raw).ok().map(Self)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a specimen in a journal or trade inventory.
    JournalEntryId
}

define_id! {
    /// Unique identifier for one assistant turn.
    TurnId
}

define_id! {
    /// Unique identifier for a score ledger row.
    ScoreEntryId
}

define_id! {
    /// Unique identifier for a land access listing.
    ListingId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let first = JournalEntryId::new();
        let second = JournalEntryId::new();
        assert_ne!(first, second);
        assert_ne!(first.into_inner(), Uuid::nil());
    }

    #[test]
    fn parse_rejects_legacy_ids() {
        assert!(JournalEntryId::parse("2024-05-01T10:00:00.000Z0.123").is_none());
        let id = ListingId::new();
        assert_eq!(ListingId::parse(&id.to_string()), Some(id));
    }

    #[test]
    fn id_serializes_as_plain_uuid_string() {
        let id = TurnId::new();
        let json = serde_json::to_string(&id).ok();
        assert_eq!(json, Some(format!("\"{id}\"")));
    }
}
