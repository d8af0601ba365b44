//! HTTP and `WebSocket` surface for the `RockHound` engine.
//!
//! This crate provides an Axum server that exposes:
//!
//! - **`WebSocket` endpoint** (`/ws/events`) streaming every engine event
//!   as JSON via [`tokio::sync::broadcast`]
//! - **REST reads** for state, conversation, achievements, store and
//!   listings
//! - **REST intents** that start assistant turns, cancel the running one,
//!   buy store items and publish land listings
//!
//! # Architecture
//!
//! Handlers hold an [`AppState`] wrapping the [`rockhound_core::GameEngine`].
//! Turn intents return `202 Accepted` once the engine has taken its busy
//! guard; the turn's fragments, rewards and end marker follow on the
//! `WebSocket`. Engine refusals map to HTTP status codes in [`ApiError`].

pub mod error;
pub mod handlers;
pub mod intents;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use state::AppState;
