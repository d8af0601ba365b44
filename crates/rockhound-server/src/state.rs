//! Shared application state for the API server.

use rockhound_core::GameEngine;
use rockhound_types::EngineEvent;
use tokio::sync::broadcast;

/// State shared by every handler.
///
/// The engine is already shared internally, so handlers clone nothing but
/// the `Arc` around this struct.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The running game.
    pub engine: GameEngine,
}

impl AppState {
    /// Wrap a started engine.
    pub const fn new(engine: GameEngine) -> Self {
        Self { engine }
    }

    /// Subscribe to engine events.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.engine.subscribe()
    }
}
