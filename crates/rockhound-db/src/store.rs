//! State stores: a JSON file on disk and an in-memory slot.
//!
//! Both stores hold the same serialized document, so the in-memory store
//! exercises the exact encode/decode path the file store uses.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rockhound_ledger::{OpeningBalance, carry_opening_balance};
use rockhound_types::GameState;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::decode::{Decoded, decode_state};
use crate::error::DbError;

/// Where a loaded state came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadSource {
    /// Nothing was saved yet.
    Fresh,
    /// The saved state decoded cleanly.
    Restored,
    /// The saved state needed fallbacks.
    Recovered {
        /// One note per fallback taken.
        issues: Vec<String>,
    },
}

/// A loaded state and how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    /// The state to run with.
    pub state: GameState,
    /// Provenance.
    pub source: LoadSource,
}

impl LoadOutcome {
    fn fresh() -> Self {
        Self {
            state: GameState::default(),
            source: LoadSource::Fresh,
        }
    }

    /// Decode a saved document and square its ledger with its score.
    fn from_document(raw: &str) -> Self {
        let Decoded { mut state, mut issues } = decode_state(raw);
        match carry_opening_balance(&mut state) {
            Ok(OpeningBalance::Carried(row)) => {
                issues.push(format!("ledger opened with {} points", row.delta));
            }
            Ok(OpeningBalance::Rebased { discarded }) => issues.push(format!(
                "ledger rebased on score {} after discarding {discarded} inconsistent rows",
                state.score
            )),
            Ok(OpeningBalance::Balanced) => {}
            Err(e) => issues.push(format!("ledger could not be opened: {e}")),
        }
        let source = if issues.is_empty() {
            LoadSource::Restored
        } else {
            for issue in &issues {
                warn!(issue = %issue, "state recovered with fallback");
            }
            LoadSource::Recovered { issues }
        };
        Self { state, source }
    }
}

// ---------------------------------------------------------------------------
// StateStore
// ---------------------------------------------------------------------------

/// The persistence gateway the engine talks to.
#[derive(Debug, Clone)]
pub enum StateStore {
    /// JSON document on disk.
    Json(JsonFileStore),
    /// Process-local slot, for tests and ephemeral sessions.
    Memory(MemoryStore),
}

impl StateStore {
    /// Load the saved state. Content problems never fail the load.
    pub async fn load(&self) -> LoadOutcome {
        match self {
            Self::Json(store) => store.load().await,
            Self::Memory(store) => store.load().await,
        }
    }

    /// Replace the saved state.
    pub async fn save(&self, state: &GameState) -> Result<(), DbError> {
        match self {
            Self::Json(store) => store.save(state).await,
            Self::Memory(store) => store.save(state).await,
        }
    }
}

// ---------------------------------------------------------------------------
// JsonFileStore
// ---------------------------------------------------------------------------

/// Saves the state as pretty-printed JSON at a fixed path.
///
/// Writes go to a sibling temp file first and are renamed into place, so a
/// crash mid-write leaves the previous save intact.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store backed by `path`. Nothing is touched until the first call.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The state file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> LoadOutcome {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => {
                let outcome = LoadOutcome::from_document(&raw);
                info!(
                    path = %self.path.display(),
                    score = outcome.state.score,
                    entries = outcome.state.journal_entries.len(),
                    "game state loaded"
                );
                outcome
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no saved state, starting fresh");
                LoadOutcome::fresh()
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "state file unreadable, starting empty");
                LoadOutcome {
                    source: LoadSource::Recovered {
                        issues: vec![format!("state file unreadable: {e}")],
                    },
                    ..LoadOutcome::fresh()
                }
            }
        }
    }

    async fn save(&self, state: &GameState) -> Result<(), DbError> {
        let document = serde_json::to_vec_pretty(state)?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| DbError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let staging = self.staging_path();
        tokio::fs::write(&staging, &document)
            .await
            .map_err(|source| DbError::Io {
                path: staging.clone(),
                source,
            })?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(|source| DbError::Io {
                path: self.path.clone(),
                source,
            })?;

        debug!(path = %self.path.display(), bytes = document.len(), "game state saved");
        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// Keeps the serialized document in memory. Clones share the slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-loaded with a raw document, valid or not.
    pub fn with_document(raw: impl Into<String>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(raw.into()))),
        }
    }

    /// The last saved document.
    pub async fn document(&self) -> Option<String> {
        self.slot.lock().await.clone()
    }

    async fn load(&self) -> LoadOutcome {
        self.slot
            .lock()
            .await
            .as_deref()
            .map_or_else(LoadOutcome::fresh, LoadOutcome::from_document)
    }

    async fn save(&self, state: &GameState) -> Result<(), DbError> {
        let document = serde_json::to_string(state)?;
        *self.slot.lock().await = Some(document);
        Ok(())
    }
}
