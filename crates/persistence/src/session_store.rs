use crate::error::PersistenceError;
use core_types::SessionState;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Durable storage for the single `SessionState` record.
pub trait SessionStore: Send {
    /// Returns the persisted state, or defaults when nothing usable is stored.
    fn load(&self) -> SessionState;

    /// Persists `state`. The write is complete when this returns `Ok`.
    fn save(&self, state: &SessionState) -> Result<(), PersistenceError>;
}

/// Stores the session state as a JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFileSessionStore {
    path: PathBuf,
}

impl JsonFileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "session_state".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SessionStore for JsonFileSessionStore {
    fn load(&self) -> SessionState {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "No session state file, starting fresh");
                return SessionState::default();
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Session state unreadable, using defaults");
                return SessionState::default();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Session state corrupt, using defaults");
                SessionState::default()
            }
        }
    }

    fn save(&self, state: &SessionState) -> Result<(), PersistenceError> {
        let json = serde_json::to_string_pretty(state)?;
        let tmp = self.temp_path();

        let mut file = File::create(&tmp).map_err(|e| PersistenceError::io(&tmp, e))?;
        file.write_all(json.as_bytes())
            .map_err(|e| PersistenceError::io(&tmp, e))?;
        file.sync_all().map_err(|e| PersistenceError::io(&tmp, e))?;
        drop(file);

        fs::rename(&tmp, &self.path).map_err(|e| PersistenceError::io(&self.path, e))?;
        tracing::debug!(path = %self.path.display(), "Session state saved");
        Ok(())
    }
}

/// An in-memory store for tests. Clones share the same storage, so a clone kept
/// by the test observes everything the engine saved, and a fresh engine built
/// from it behaves like a restarted process.
///
/// The state round-trips through JSON exactly like the file store.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with raw JSON, e.g. a document missing some fields.
    pub fn with_raw(json: &str) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(json.to_string()))),
        }
    }

    /// The last saved state, if any save has happened.
    pub fn saved(&self) -> Option<SessionState> {
        let guard = self.slot.lock().ok()?;
        guard.as_deref().and_then(|json| serde_json::from_str(json).ok())
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> SessionState {
        self.saved().unwrap_or_default()
    }

    fn save(&self, state: &SessionState) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(state)?;
        let mut guard = self.slot.lock().map_err(|_| PersistenceError::Poisoned)?;
        *guard = Some(json);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_state() -> SessionState {
        SessionState {
            session_start_equity: Some(100.123_456_789),
            session_locked: true,
            session_trades: 3,
            session_pnl: -1.0 / 3.0,
            last_date: NaiveDate::from_ymd_opt(2024, 5, 6),
            daily_cap_hit: true,
            last_cap_date: NaiveDate::from_ymd_opt(2024, 5, 6),
            session_entries: 2,
            previous_close_equity: Some(99.5),
        }
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSessionStore::new(dir.path().join("state.json"));
        assert_eq!(store.load(), SessionState::default());
    }

    #[test]
    fn save_then_load_is_identity() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSessionStore::new(dir.path().join("state.json"));
        let state = sample_state();
        store.save(&state).unwrap();
        assert_eq!(store.load(), state);
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn corrupt_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();
        let store = JsonFileSessionStore::new(&path);
        assert_eq!(store.load(), SessionState::default());
    }

    #[test]
    fn missing_fields_default_individually() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, r#"{"session_locked": true, "session_trades": 2}"#).unwrap();
        let state = JsonFileSessionStore::new(&path).load();
        assert!(state.session_locked);
        assert_eq!(state.session_trades, 2);
        assert_eq!(state.session_start_equity, None);
        assert!(!state.daily_cap_hit);
    }

    #[test]
    fn save_overwrites_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSessionStore::new(dir.path().join("state.json"));
        store.save(&sample_state()).unwrap();
        store.save(&SessionState::default()).unwrap();
        assert_eq!(store.load(), SessionState::default());
    }

    #[test]
    fn memory_store_clones_share_storage() {
        let store = MemorySessionStore::new();
        let observer = store.clone();
        assert_eq!(observer.saved(), None);
        store.save(&sample_state()).unwrap();
        assert_eq!(observer.load(), sample_state());
    }

    #[test]
    fn memory_store_seeded_with_partial_json() {
        let store = MemorySessionStore::with_raw(r#"{"session_pnl": 4.5}"#);
        let state = store.load();
        assert_eq!(state.session_pnl, 4.5);
        assert_eq!(state.session_trades, 0);
    }
}
