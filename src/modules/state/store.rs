use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use redb::{Database, TableDefinition, TableError};
use serde_json::Value;
use thiserror::Error;

use super::{GuardState, SweepReport};

#[derive(Debug, Error)]
pub enum StateError {
    #[error("state file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("state serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("state database error: {0}")]
    Redb(#[from] redb::Error),
}

fn redb_error(err: impl Into<redb::Error>) -> StateError {
    StateError::Redb(err.into())
}

/// Durable home of the single [`GuardState`] record.
///
/// Stores never lock across processes. One guarded client per store is the
/// supported configuration; two writers sharing a store race last-writer-wins.
pub trait StateStore: Send + Sync {
    fn load(&self) -> Result<GuardState, StateError>;

    fn save(&self, state: &GuardState) -> Result<(), StateError>;

    /// Load, sweep expired fields and persist the result when anything changed.
    fn sweep(
        &self,
        now: DateTime<Utc>,
        max_pending_age: Duration,
    ) -> Result<(GuardState, SweepReport), StateError> {
        let mut state = self.load()?;
        let report = state.sweep(now, max_pending_age);
        if report.changed() {
            log::debug!(
                "state sweep cleared verification={} cooldowns={}",
                report.cleared_verification,
                report.cleared_cooldowns
            );
            self.save(&state)?;
        }
        Ok((state, report))
    }
}

/// Pretty-printed JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStateStore {
    path: PathBuf,
}

impl JsonFileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for JsonFileStateStore {
    fn load(&self) -> Result<GuardState, StateError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(GuardState::default()),
            Err(err) => return Err(err.into()),
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(value) => Ok(GuardState::from_value(&value)),
            Err(err) => {
                log::warn!(
                    "state file {} is not valid JSON ({}); using defaults",
                    self.path.display(),
                    err
                );
                Ok(GuardState::default())
            }
        }
    }

    fn save(&self, state: &GuardState) -> Result<(), StateError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let rendered = serde_json::to_string_pretty(state)?;
        let staging = self.path.with_extension("tmp");
        fs::write(&staging, rendered)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }
}

const STATE_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("guard_state");
const STATE_KEY: &str = "state";

/// Embedded redb database holding the record as JSON bytes under one key.
pub struct RedbStateStore {
    db: Database,
}

impl RedbStateStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StateError> {
        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let db = Database::create(path.as_ref()).map_err(redb_error)?;
        Ok(Self { db })
    }
}

impl StateStore for RedbStateStore {
    fn load(&self) -> Result<GuardState, StateError> {
        let read = self.db.begin_read().map_err(redb_error)?;
        let table = match read.open_table(STATE_TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(GuardState::default()),
            Err(err) => return Err(redb_error(err)),
        };

        let Some(bytes) = table.get(STATE_KEY).map_err(redb_error)? else {
            return Ok(GuardState::default());
        };
        match serde_json::from_slice::<Value>(bytes.value()) {
            Ok(value) => Ok(GuardState::from_value(&value)),
            Err(err) => {
                log::warn!("stored state is not valid JSON ({}); using defaults", err);
                Ok(GuardState::default())
            }
        }
    }

    fn save(&self, state: &GuardState) -> Result<(), StateError> {
        let bytes = serde_json::to_vec(state)?;
        let write = self.db.begin_write().map_err(redb_error)?;
        {
            let mut table = write.open_table(STATE_TABLE).map_err(redb_error)?;
            table
                .insert(STATE_KEY, bytes.as_slice())
                .map_err(redb_error)?;
        }
        write.commit().map_err(redb_error)?;
        Ok(())
    }
}

/// Process-local store, mostly for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    state: Mutex<GuardState>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: GuardState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn snapshot(&self) -> GuardState {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Result<GuardState, StateError> {
        Ok(self.snapshot())
    }

    fn save(&self, state: &GuardState) -> Result<(), StateError> {
        *self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = state.clone();
        Ok(())
    }
}
