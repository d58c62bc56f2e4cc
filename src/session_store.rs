//! Session persistence: a key-value store of [`Session`]s keyed by id.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::cliconfig::Session;
use crate::error::StoreError;

/// Load/save contract the processor relies on. Callers serialize access per
/// session id; a store does no locking of its own.
pub trait SessionStore {
    fn load(&self, session_id: &str) -> Result<Session, StoreError>;

    fn save(&mut self, session: &Session) -> Result<(), StoreError>;

    /// Loads the session, creating and saving a fresh one when it does not
    /// exist yet.
    fn load_or_create(&mut self, session_id: &str) -> Result<Session, StoreError> {
        match self.load(session_id) {
            Err(StoreError::NotFound(_)) => {
                info!("creating session '{}'", session_id);
                let session = Session::new(session_id);
                self.save(&session)?;
                Ok(session)
            }
            other => other,
        }
    }
}

/// Keeps sessions in memory; used by tests and embedders that persist
/// elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: HashMap<String, Session>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn load(&self, session_id: &str) -> Result<Session, StoreError> {
        self.sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(session_id.to_string()))
    }

    fn save(&mut self, session: &Session) -> Result<(), StoreError> {
        self.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }
}

/// One pretty-printed JSON file per session: `<dir>/<id>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, session_id: &str) -> Result<PathBuf, StoreError> {
        let valid = !session_id.is_empty()
            && session_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));
        if !valid {
            return Err(StoreError::InvalidId(session_id.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", session_id)))
    }
}

impl SessionStore for JsonFileStore {
    fn load(&self, session_id: &str) -> Result<Session, StoreError> {
        let path = self.path_for(session_id)?;
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(session_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        debug!("loaded session from {}", path.display());
        Ok(serde_json::from_str(&text)?)
    }

    fn save(&mut self, session: &Session) -> Result<(), StoreError> {
        let path = self.path_for(&session.id)?;
        fs::create_dir_all(&self.dir)?;
        fs::write(&path, serde_json::to_string_pretty(session)?)?;
        debug!("saved session to {}", path.display());
        Ok(())
    }
}
