//! `RockHound` engine binary.
//!
//! Wires together persistence, the assistant transport, the turn engine and
//! the HTTP server, then serves until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `rockhound-config.yaml` (or `ROCKHOUND_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Open the state store
//! 4. Load prompt templates and configure the LLM backend
//! 5. Start the engine (load, seed, persistence writer)
//! 6. Serve HTTP + `WebSocket` until shutdown
//! 7. Flush pending saves

mod error;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use rockhound_assistant::AssistantClient;
use rockhound_core::config::{LogFormat, LoggingConfig, PersistenceBackend, PersistenceConfig};
use rockhound_core::{GameConfig, GameEngine};
use rockhound_db::{JsonFileStore, MemoryStore, StateStore};
use rockhound_server::AppState;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::StartupError;

/// Default config file, relative to the working directory.
const CONFIG_FILE: &str = "rockhound-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any initialization step or the server fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration.
    let config_path = std::env::var("ROCKHOUND_CONFIG")
        .map_or_else(|_| PathBuf::from(CONFIG_FILE), PathBuf::from);
    let config = GameConfig::from_file_or_default(&config_path)
        .map_err(StartupError::from)
        .with_context(|| format!("loading {}", config_path.display()))?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!(
        config = %config_path.display(),
        backend = ?config.assistant.backend,
        model = config.assistant.model,
        persistence = ?config.persistence.backend,
        "rockhound-engine starting"
    );

    // 3. Open the state store.
    let store = open_store(&config.persistence);

    // 4. Assistant transport.
    let assistant = AssistantClient::from_config(&config.assistant)
        .map_err(StartupError::from)
        .context("configuring the assistant")?;
    info!(
        backend = assistant.backend_name(),
        templates_dir = %config.assistant.templates_dir.display(),
        "assistant transport configured"
    );

    // 5. Engine.
    let engine = GameEngine::start(config.game.clone(), store, Arc::new(assistant)).await;
    let state = Arc::new(AppState::new(engine.clone()));

    // 6. Serve until Ctrl-C.
    rockhound_server::start_server(&config.server, state, shutdown_signal())
        .await
        .map_err(StartupError::from)?;

    // 7. Flush pending saves.
    engine.cancel_turn().await;
    if let Err(e) = engine.flush().await {
        warn!(error = %e, "final save did not complete");
    }
    info!("rockhound-engine shutdown complete");
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    match config.format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
    }
}

fn open_store(config: &PersistenceConfig) -> StateStore {
    match config.backend {
        PersistenceBackend::Json => {
            info!(path = %config.state_path.display(), "using JSON file store");
            StateStore::Json(JsonFileStore::new(&config.state_path))
        }
        PersistenceBackend::Memory => {
            warn!("using in-memory store; progress is lost on exit");
            StateStore::Memory(MemoryStore::new())
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
