//! Session context
//!
//! Holds the credentials attached to every request. The session is shared as
//! `Arc<Session>`; reads and writes go through an interior lock so a 401
//! handler can clear it while other requests are in flight.

use crate::error::ClientError;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Username and bearer token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// User name
    pub username: String,
    /// Bearer token
    pub token: String,
}

impl Credentials {
    /// Create credentials
    #[must_use]
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            token: token.into(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Stored {
    credentials: Option<Credentials>,
}

/// Current credentials, if any
#[derive(Debug, Default)]
pub struct Session {
    credentials: RwLock<Option<Credentials>>,
}

impl Session {
    /// Empty session
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Session holding credentials
    #[must_use]
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            credentials: RwLock::new(Some(credentials)),
        }
    }

    /// Load from a JSON file; a missing file yields an empty session
    ///
    /// # Errors
    /// `ClientError::Config` if the file exists but cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, ClientError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(ClientError::Config(format!("{}: {e}", path.display()))),
        };
        let stored: Stored = serde_json::from_str(&raw)
            .map_err(|e| ClientError::Config(format!("{}: {e}", path.display())))?;
        Ok(Self {
            credentials: RwLock::new(stored.credentials),
        })
    }

    /// Write to a JSON file
    ///
    /// # Errors
    /// `ClientError::Config` if the file cannot be written
    pub fn persist(&self, path: &Path) -> Result<(), ClientError> {
        let stored = Stored {
            credentials: self.credentials(),
        };
        let raw = serde_json::to_string_pretty(&stored)?;
        std::fs::write(path, raw).map_err(|e| ClientError::Config(format!("{}: {e}", path.display())))
    }

    /// Current credentials
    #[must_use]
    pub fn credentials(&self) -> Option<Credentials> {
        self.credentials.read().clone()
    }

    /// Whether credentials are present
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.credentials.read().is_some()
    }

    /// Store credentials
    pub fn set_credentials(&self, credentials: Credentials) {
        tracing::debug!(user = %credentials.username, "session credentials set");
        *self.credentials.write() = Some(credentials);
    }

    /// Forget credentials
    pub fn clear(&self) {
        tracing::debug!("session cleared");
        *self.credentials.write() = None;
    }
}

/// Source of fresh credentials when the server answers 401
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthPrompt: Send + Sync {
    /// Ask for credentials; `None` when the user declines
    async fn request_credentials(&self) -> Option<Credentials>;
}
