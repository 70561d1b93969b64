//! Error types for the Vizier client
//!
//! Provides the failure taxonomy of a server round-trip:
//! - Authentication required (recovered by prompting, never an action error)
//! - Resource not found, server-reported errors, unparseable error bodies
//! - Local validation failures (never sent to the server)
//! - Transport failures, with the upload-size special case
//! - Client-side edit guards (edit in progress, read-only, frozen cell)
//!
//! Everything except `AuthRequired` can be recorded as a dismissible
//! [`ActionError`] in an [`ActionErrorLog`].

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use ulid::Ulid;
use vizier_command::CommandError;
use vizier_resource::ResourceError;

/// Message shown for transport failures and unreadable error bodies
pub const GENERIC_MESSAGE: &str = "There was an error communicating with the server";

/// Message shown when an upload is rejected for its size
pub const UPLOAD_TOO_LARGE_MESSAGE: &str =
    "The file could not be uploaded; it may exceed the maximum upload size";

/// Main client error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Server answered 401
    #[error("authentication required")]
    AuthRequired,

    /// Server answered 404 for a specific resource
    #[error("{kind} '{id}' not found (status {status})")]
    NotFound {
        /// Resource kind (`project`, `module`, ...)
        kind: String,
        /// Identifier or URL of the resource
        id: String,
        /// HTTP status
        status: u16,
    },

    /// Server answered with an error message
    #[error("{message}")]
    Server {
        /// Message from the error body
        message: String,
        /// HTTP status
        status: u16,
    },

    /// Server answered with an error whose body is not `{message}` JSON
    #[error("{GENERIC_MESSAGE} (status {status})")]
    UnparseableBody {
        /// HTTP status
        status: u16,
    },

    /// Form values rejected locally
    #[error("invalid command arguments: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Connection-level failure
    #[error("{GENERIC_MESSAGE}: {0}")]
    Transport(String),

    /// Transport failure that looks like an upload-size violation
    #[error("{UPLOAD_TOO_LARGE_MESSAGE}")]
    UploadTooLarge,

    /// Another edit of this notebook has not resolved yet
    #[error("another edit is still in progress")]
    EditInProgress,

    /// The displayed workflow is not the branch head
    #[error("workflow is read-only")]
    ReadOnlyWorkflow,

    /// The target cell is behind the freeze boundary
    #[error("cell {index} is frozen by an earlier error")]
    FrozenCell {
        /// Cell index
        index: usize,
    },

    /// A required hypermedia link is absent
    #[error("missing link '{relation}'")]
    MissingLink {
        /// Relation name
        relation: String,
    },

    /// No cell shows the given module
    #[error("unknown module '{0}'")]
    UnknownModule(String),

    /// Successful response whose body is not JSON
    #[error("invalid response body: {0}")]
    Decode(String),

    /// Invalid configuration or session file
    #[error("configuration error: {0}")]
    Config(String),
}

// Message shapes the browser, proxies and servers use for oversized uploads
static UPLOAD_SIZE_HINT: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?i)(\b413\b|too large|payload|request entity|connection (was )?reset|broken pipe)")
        .ok()
});

impl ClientError {
    /// Classify a transport failure message
    ///
    /// During an upload, messages that look like a size violation become
    /// [`ClientError::UploadTooLarge`].
    #[must_use]
    pub fn from_transport(message: impl Into<String>, uploading: bool) -> Self {
        let message = message.into();
        let looks_oversized = UPLOAD_SIZE_HINT
            .as_ref()
            .is_some_and(|re| re.is_match(&message));
        if uploading && looks_oversized {
            Self::UploadTooLarge
        } else {
            Self::Transport(message)
        }
    }

    /// Missing link for a relation
    #[must_use]
    pub fn missing_link(relation: &str) -> Self {
        Self::MissingLink {
            relation: relation.to_string(),
        }
    }

    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::EditInProgress | Self::UnparseableBody { .. }
        ) || matches!(self, Self::Server { status, .. } if *status >= 500)
    }

    /// HTTP status carried by the error, if any
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::AuthRequired => Some(401),
            Self::NotFound { status, .. }
            | Self::Server { status, .. }
            | Self::UnparseableBody { status } => Some(*status),
            _ => None,
        }
    }

    /// Dismissible record for the page, `None` for `AuthRequired`
    #[must_use]
    pub fn to_action_error(&self, title: impl Into<String>) -> Option<ActionError> {
        match self {
            Self::AuthRequired => None,
            other => Some(ActionError::new(title, other.to_string())),
        }
    }
}

impl From<ResourceError> for ClientError {
    fn from(err: ResourceError) -> Self {
        match err {
            ResourceError::MissingLink { relation } => Self::MissingLink { relation },
            ResourceError::InvalidJson(message) => Self::Decode(message),
        }
    }
}

impl From<CommandError> for ClientError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::Validation(messages) => Self::Validation(messages),
            other => Self::Validation(vec![other.to_string()]),
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// One failed user action, displayed until dismissed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionError {
    /// Unique id
    pub id: Ulid,
    /// Short title (the action that failed)
    pub title: String,
    /// Detail message
    pub message: String,
    /// When the failure was recorded
    pub at: DateTime<Utc>,
}

impl ActionError {
    /// Create a record stamped now
    #[must_use]
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: Ulid::new(),
            title: title.into(),
            message: message.into(),
            at: Utc::now(),
        }
    }
}

/// Append-only list of action errors, independent of the notebook snapshot
#[derive(Debug, Default)]
pub struct ActionErrorLog {
    entries: Mutex<Vec<ActionError>>,
}

impl ActionErrorLog {
    /// Create an empty log
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure; returns the record id, or `None` for `AuthRequired`
    pub fn record(&self, title: &str, err: &ClientError) -> Option<Ulid> {
        let entry = err.to_action_error(title)?;
        let id = entry.id;
        tracing::debug!(%id, title, error = %err, "action error recorded");
        self.entries.lock().push(entry);
        Some(id)
    }

    /// Remove a record; returns whether it existed
    pub fn dismiss(&self, id: Ulid) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|e| e.id != id);
        entries.len() != before
    }

    /// Snapshot of the current records, oldest first
    #[must_use]
    pub fn entries(&self) -> Vec<ActionError> {
        self.entries.lock().clone()
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Check if there is no record
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
