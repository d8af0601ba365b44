//! Turn engine, configuration and assistant transport seam for RockHound.
//!
//! The engine host owns the only mutable [`GameState`](rockhound_types::GameState).
//! UI surfaces dispatch intents into a [`GameEngine`] and observe it through
//! broadcast [`EngineEvent`](rockhound_types::EngineEvent)s.
//!
//! # Architecture
//!
//! ```text
//! intent --> GameEngine (busy guard) --spawn--> turn task
//!                                                 |
//!             AssistantTransport::stream_reply <--+
//!                                                 |
//!             StreamAccumulator -> TagExtractor --+--> reconcile / settle
//!                                                 |        |
//!                                                 |   settle_unlocks
//!                                                 |        |
//!             broadcast events <------------------+--> persistence writer --> StateStore
//! ```
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `rockhound-config.yaml`
//! - [`engine`] -- [`GameEngine`] and the per-turn state machine
//! - [`transport`] -- [`AssistantTransport`] trait and [`TurnRequest`]
//! - [`seed`] -- Starting content for a fresh game
//! - [`error`] -- Shared error types

pub mod config;
pub mod engine;
pub mod error;
pub mod seed;
pub mod transport;

pub use config::{ConfigError, GameConfig};
pub use engine::{GameEngine, TurnHandle, TurnReport, UserMessage};
pub use error::EngineError;
pub use transport::{AssistantTransport, ReplyStream, TransportError, TurnRequest};
