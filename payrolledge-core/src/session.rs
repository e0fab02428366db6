// src/session.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use crate::error::{io_context, PayrollError};

pub const DEFAULT_TOKEN_FILE: &str = "payrolledge_token.json";

// Structure for storing the bearer token persistently
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredSession {
    pub access_token: String,
    pub token_type: String,
    pub saved_at: DateTime<Utc>,
}

/// Explicit session context handed to the API client.
///
/// Clones share the same in-memory state, so clearing the session from the
/// 401 interceptor is immediately visible to every holder.
#[derive(Clone, Debug)]
pub struct SessionContext {
    token_file_path: PathBuf,
    state: Arc<Mutex<Option<StoredSession>>>,
}

impl SessionContext {
    /// An empty session bound to `token_file_path`. Nothing is read from disk.
    pub fn new(token_file_path: impl Into<PathBuf>) -> Self {
        Self {
            token_file_path: token_file_path.into(),
            state: Arc::new(Mutex::new(None)),
        }
    }

    /// Loads the persisted token if the file exists. A missing file is an
    /// unauthenticated session, not an error.
    pub fn load(token_file_path: impl Into<PathBuf>) -> Result<Self, PayrollError> {
        let session = Self::new(token_file_path);
        let stored = Self::read_token_file(&session.token_file_path)?;
        if stored.is_some() {
            debug!("Loaded session token from {:?}", session.token_file_path);
        }
        *session.guard() = stored;
        Ok(session)
    }

    fn read_token_file(path: &Path) -> Result<Option<StoredSession>, PayrollError> {
        if !path.exists() {
            return Ok(None);
        }
        let json_string = fs::read_to_string(path)
            .map_err(|e| io_context(e, format!("Failed to read token file: {:?}", path)))?;
        let stored: StoredSession = serde_json::from_str(&json_string)?;
        Ok(Some(stored))
    }

    /// Stores `access_token` in memory and on disk.
    pub fn persist(&self, access_token: &str) -> Result<StoredSession, PayrollError> {
        let stored = StoredSession {
            access_token: access_token.trim().to_string(),
            token_type: "bearer".to_string(),
            saved_at: Utc::now(),
        };
        if stored.access_token.is_empty() {
            return Err(PayrollError::ConfigError(
                "Refusing to persist an empty access token".to_string(),
            ));
        }

        let json_string = serde_json::to_string_pretty(&stored)?;

        if let Some(parent) = self.token_file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    io_context(
                        e,
                        format!("Failed to create directory for token file: {:?}", parent),
                    )
                })?;
            }
        }

        let mut file = File::create(&self.token_file_path).map_err(|e| {
            io_context(
                e,
                format!("Failed to create token file: {:?}", self.token_file_path),
            )
        })?;
        file.write_all(json_string.as_bytes()).map_err(|e| {
            io_context(
                e,
                format!(
                    "Failed to write token data to file: {:?}",
                    self.token_file_path
                ),
            )
        })?;

        *self.guard() = Some(stored.clone());
        info!("Session token saved to {:?}", self.token_file_path);
        Ok(stored)
    }

    /// Drops the in-memory token and removes the token file.
    pub fn clear(&self) -> Result<(), PayrollError> {
        *self.guard() = None;
        if self.token_file_path.exists() {
            fs::remove_file(&self.token_file_path).map_err(|e| {
                io_context(
                    e,
                    format!("Failed to remove token file: {:?}", self.token_file_path),
                )
            })?;
            info!("Session cleared, removed {:?}", self.token_file_path);
        } else {
            warn!("Session cleared, no token file at {:?}", self.token_file_path);
        }
        Ok(())
    }

    pub fn token(&self) -> Option<String> {
        self.guard().as_ref().map(|s| s.access_token.clone())
    }

    pub fn stored(&self) -> Option<StoredSession> {
        self.guard().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.guard().is_some()
    }

    pub fn token_file_path(&self) -> &Path {
        &self.token_file_path
    }

    fn guard(&self) -> MutexGuard<'_, Option<StoredSession>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
