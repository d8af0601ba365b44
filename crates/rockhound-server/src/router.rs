//! Axum router construction.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS and request tracing.

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, intents, ws};

/// Largest accepted request body. Specimen photos arrive base64-encoded.
const BODY_LIMIT: usize = 16_777_216;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /ws/events` -- `WebSocket` engine event stream
/// - `GET /api/state`, `/api/conversation`, `/api/achievements`,
///   `/api/store`, `/api/listings` -- reads
/// - `POST /api/messages`, `/api/challenges`, `/api/investigations`,
///   `/api/trades` -- turn intents
/// - `DELETE /api/turn` -- cancel the running turn
/// - `POST /api/purchases/{item_id}`, `/api/listings` -- direct mutations
///
/// CORS allows any origin so a locally served UI can reach the API.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // WebSocket
        .route("/ws/events", get(ws::ws_events))
        // Reads
        .route("/api/state", get(handlers::get_state))
        .route("/api/conversation", get(handlers::get_conversation))
        .route("/api/achievements", get(handlers::get_achievements))
        .route("/api/store", get(handlers::get_store))
        .route(
            "/api/listings",
            get(handlers::get_listings).post(intents::post_listing),
        )
        // Turn intents
        .route("/api/messages", post(intents::post_message))
        .route("/api/challenges", post(intents::post_challenge))
        .route("/api/investigations", post(intents::post_investigation))
        .route("/api/trades", post(intents::post_trade))
        .route("/api/turn", delete(intents::delete_turn))
        // Store
        .route("/api/purchases/{item_id}", post(intents::post_purchase))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
