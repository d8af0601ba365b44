//! Read-only REST handlers.
//!
//! Every read is a snapshot clone taken under the engine's read lock, so a
//! turn streaming in the background is never blocked for long.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use rockhound_ledger::ConservationResult;
use rockhound_types::{DifficultyTier, GameState, StoreItem};
use serde::Serialize;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Response body for `GET /api/state`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StateResponse {
    #[serde(flatten)]
    state: GameState,
    /// Challenge tier for the current score.
    tier: DifficultyTier,
    /// Whether a turn is running.
    busy: bool,
    /// Whether the score agrees with the ledger.
    ledger_balanced: bool,
}

/// One store item with its ownership flag.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StoreItemView {
    #[serde(flatten)]
    item: StoreItem,
    owned: bool,
    affordable: bool,
}

// ---------------------------------------------------------------------------
// GET /api/state
// ---------------------------------------------------------------------------

/// Current game state with a few derived fields.
pub async fn get_state(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let game = state.engine.state().await;
    let ledger_balanced = matches!(
        state.engine.ledger_status().await,
        ConservationResult::Balanced
    );
    Json(StateResponse {
        tier: DifficultyTier::for_score(game.score),
        busy: state.engine.is_busy(),
        ledger_balanced,
        state: game,
    })
}

// ---------------------------------------------------------------------------
// GET /api/conversation
// ---------------------------------------------------------------------------

/// The visible conversation, oldest first.
pub async fn get_conversation(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.engine.conversation().await)
}

// ---------------------------------------------------------------------------
// GET /api/achievements
// ---------------------------------------------------------------------------

/// Every achievement with its unlock status.
pub async fn get_achievements(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.engine.achievements().await)
}

// ---------------------------------------------------------------------------
// GET /api/store
// ---------------------------------------------------------------------------

/// The store catalog with ownership and affordability.
pub async fn get_store(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let game = state.engine.state().await;
    let items: Vec<StoreItemView> = state
        .engine
        .store_items()
        .iter()
        .map(|item| StoreItemView {
            owned: game.purchased_items.contains(&item.id),
            affordable: game.score >= item.price,
            item: item.clone(),
        })
        .collect();
    Json(items)
}

// ---------------------------------------------------------------------------
// GET /api/listings
// ---------------------------------------------------------------------------

/// Land access listings, newest first.
pub async fn get_listings(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.engine.listings().await)
}
