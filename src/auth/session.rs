//! Session token storage.
//!
//! The dashboard reads a single opaque bearer token from persistent client
//! storage. The guard and the aggregator only ever read it through
//! [`SessionStore`]; the login/logout flow is the sole writer and goes
//! through [`SessionWriter`].

use crate::types::{AppError, Result};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default storage key for the bearer token.
pub const DEFAULT_TOKEN_KEY: &str = "voxa_token";

/// Read-only view of the session storage.
pub trait SessionStore: Send + Sync {
    /// Returns the stored token, if any. Unreadable storage reads as `None`.
    fn get_token(&self) -> Option<String>;
}

/// Write access to the session storage, used by the authentication flow.
pub trait SessionWriter: SessionStore {
    /// Persists a new token, replacing any previous one.
    fn set_token(&self, token: &str) -> Result<()>;

    /// Removes the stored token.
    fn clear(&self) -> Result<()>;
}

/// A single read of the session storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
}

impl Session {
    /// Reads the store once.
    pub fn read(store: &dyn SessionStore) -> Self {
        Self {
            token: store.get_token(),
        }
    }

    /// A present, non-empty token is authenticated.
    pub fn is_authenticated(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// The token, only when it would authenticate.
    pub fn bearer(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }
}

// ============= In-memory storage =============

/// Session storage held in memory. Used by tests and embedders that manage
/// persistence themselves.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    token: RwLock<Option<String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn get_token(&self) -> Option<String> {
        self.token.read().clone()
    }
}

impl SessionWriter for MemorySessionStore {
    fn set_token(&self, token: &str) -> Result<()> {
        *self.token.write() = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.token.write() = None;
        Ok(())
    }
}

// ============= File-backed storage =============

/// Session storage persisted as a small JSON object on disk
/// (`{"voxa_token": "..."}`), the command-line analog of browser local
/// storage.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
    key: String,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_key(path, DEFAULT_TOKEN_KEY)
    }

    pub fn with_key(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Option<Map<String, Value>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Session storage at {:?} is unreadable: {}", self.path, e);
                return None;
            }
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Some(map),
            Ok(_) | Err(_) => {
                warn!("Session storage at {:?} is not a JSON object", self.path);
                None
            }
        }
    }

    fn write_entries(&self, entries: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    AppError::Internal(format!("Failed to create {:?}: {}", parent, e))
                })?;
            }
        }

        let body = serde_json::to_string_pretty(entries)
            .map_err(|e| AppError::Internal(format!("Failed to encode session: {}", e)))?;
        fs::write(&self.path, body)
            .map_err(|e| AppError::Internal(format!("Failed to write {:?}: {}", self.path, e)))
    }
}

impl SessionStore for FileSessionStore {
    fn get_token(&self) -> Option<String> {
        self.read_entries()?
            .get(&self.key)
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

impl SessionWriter for FileSessionStore {
    fn set_token(&self, token: &str) -> Result<()> {
        let mut entries = self.read_entries().unwrap_or_default();
        entries.insert(self.key.clone(), Value::String(token.to_string()));
        self.write_entries(&entries)?;
        debug!("Stored session token in {:?}", self.path);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let Some(mut entries) = self.read_entries() else {
            return Ok(());
        };
        if entries.remove(&self.key).is_some() {
            self.write_entries(&entries)?;
            debug!("Cleared session token in {:?}", self.path);
        }
        Ok(())
    }
}
