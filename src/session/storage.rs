// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Durable storage for the current session.
//!
//! Storage is a best-effort cache: a failed read looks exactly like "no session
//! yet", and failed writes are logged at debug level and dropped.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::StorageError;

use super::types::Session;

/// Namespace directory reserved for SDK state.
pub const STORAGE_NAMESPACE: &str = "honeycomb";

/// File holding the persisted session inside the namespace.
pub const SESSION_FILE: &str = "session.json";

/// Persists a single session (id and start time as one unit).
#[cfg_attr(test, mockall::automock)]
pub trait SessionStorage: Send + Sync {
    /// Read the persisted session, or `None` if absent, corrupt or unreadable.
    fn read(&self) -> Option<Session>;

    /// Overwrite the persisted session.
    fn save(&self, session: &Session);

    /// Reset to the "no session" state.
    fn clear(&self);
}

/// File-backed session storage.
///
/// The id and start time are written together as one JSON document, staged in a
/// temporary file and renamed into place, so readers never observe half an update.
#[derive(Debug, Clone)]
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    /// Storage in the platform's local data directory.
    ///
    /// Returns `None` when no such directory can be determined.
    pub fn open_default() -> Option<Self> {
        dirs::data_local_dir().map(|dir| Self::open_in(&dir.join(STORAGE_NAMESPACE)))
    }

    /// Storage under an explicit directory.
    ///
    /// The directory is created lazily on first save.
    pub fn open_in(dir: &Path) -> Self {
        Self {
            path: dir.join(SESSION_FILE),
        }
    }

    /// Get the session file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn try_read(&self) -> Result<Option<Session>, StorageError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let session: Session = serde_json::from_str(&content)?;
        if session.id.is_empty() {
            return Err(StorageError::Corrupted("empty session id".to_string()));
        }
        Ok(Some(session))
    }

    fn try_save(&self, session: &Session) -> Result<(), StorageError> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| StorageError::Unavailable("session path has no parent".to_string()))?;
        std::fs::create_dir_all(parent)?;

        let staging = parent.join(format!(".{}.{}", SESSION_FILE, uuid::Uuid::new_v4().simple()));
        let content = serde_json::to_vec(session)?;
        std::fs::write(&staging, content)?;
        if let Err(e) = std::fs::rename(&staging, &self.path) {
            let _ = std::fs::remove_file(&staging);
            return Err(e.into());
        }
        Ok(())
    }

    fn try_clear(&self) -> Result<(), StorageError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl SessionStorage for FileSessionStorage {
    fn read(&self) -> Option<Session> {
        match self.try_read() {
            Ok(session) => session,
            Err(e) => {
                tracing::debug!(path = %self.path.display(), error = %e, "Ignoring unreadable session");
                None
            }
        }
    }

    fn save(&self, session: &Session) {
        if let Err(e) = self.try_save(session) {
            tracing::debug!(path = %self.path.display(), error = %e, "Failed to persist session");
        }
    }

    fn clear(&self) {
        if let Err(e) = self.try_clear() {
            tracing::debug!(path = %self.path.display(), error = %e, "Failed to clear session");
        }
    }
}

/// Process-local storage, used when no durable location is available and in tests.
///
/// Clones share the same cell, so several managers can observe one "disk".
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStorage {
    cell: Arc<Mutex<Option<Session>>>,
}

impl InMemorySessionStorage {
    /// Create empty storage.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for InMemorySessionStorage {
    fn read(&self) -> Option<Session> {
        self.cell.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn save(&self, session: &Session) {
        *self.cell.lock().unwrap_or_else(|e| e.into_inner()) = Some(session.clone());
    }

    fn clear(&self) {
        *self.cell.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}
