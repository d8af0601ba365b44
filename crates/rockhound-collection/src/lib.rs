//! Game rules for `RockHound` collections.
//!
//! Everything here operates on a [`GameState`](rockhound_types::GameState)
//! the caller owns. Functions validate before they mutate; callers that need
//! several steps to land together work on a staged copy and swap it in.
//!
//! # Modules
//!
//! - [`reconcile`] -- Identification payload to journal entry and score
//! - [`achievements`] -- Rule table and batch evaluation
//! - [`trade`] -- Quote and settle specimen trades
//! - [`store`] -- Store catalog and purchases
//! - [`listings`] -- Land access listings
//! - [`error`] -- Error types

pub mod achievements;
pub mod error;
pub mod listings;
pub mod reconcile;
pub mod store;
pub mod trade;

pub use achievements::{ACHIEVEMENTS, Achievement, Unlocks, evaluate, settle_unlocks, statuses};
pub use error::{CollectionError, PurchaseError, TradeError};
pub use listings::{ListingDraft, create_listing};
pub use reconcile::{Reconciliation, commit, reconcile};
pub use store::{catalog, purchase};
pub use trade::{Settlement, TradeProposal, TradeQuote, quote, settle};
