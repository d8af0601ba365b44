//! Persistence gateway for the RockHound game state.
//!
//! The engine depends on this crate only through [`StateStore::load`] and
//! [`StateStore::save`]. The whole [`GameState`](rockhound_types::GameState)
//! is one JSON document with camelCase keys.
//!
//! # Architecture
//!
//! ```text
//! StateStore
//!     |
//!     +-- Json(JsonFileStore)   temp file + rename per save
//!     +-- Memory(MemoryStore)   shared in-process slot
//!     |
//!     +-- load --> decode_state (per-field fallback)
//!                  --> carry_opening_balance (ledger squares with score)
//! ```
//!
//! # Modules
//!
//! - [`decode`] -- Tolerant document decoding
//! - [`store`] -- Store backends and load outcomes
//! - [`error`] -- Shared error types

pub mod decode;
pub mod error;
pub mod store;

pub use decode::{Decoded, decode_state};
pub use error::DbError;
pub use store::{JsonFileStore, LoadOutcome, LoadSource, MemoryStore, StateStore};
