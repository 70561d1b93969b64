//! Client configuration
//!
//! Loaded from TOML; every field has a default. `VIZIER_API_URL` overrides
//! the configured API root.

use crate::error::ClientError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding [`ClientConfig::api_url`]
pub const API_URL_ENV: &str = "VIZIER_API_URL";

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Service descriptor URL (API root)
    pub api_url: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Delay between module status polls in milliseconds
    pub poll_interval_ms: u64,
    /// Rows fetched per dataset page
    pub dataset_page_size: u64,
    /// Largest file accepted for upload, unlimited when unset
    pub max_upload_bytes: Option<u64>,
    /// User agent sent with every request
    pub user_agent: String,
    /// Where credentials are persisted
    pub session_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5000/vizier-db/api/v1".to_string(),
            request_timeout_secs: 30,
            poll_interval_ms: 1000,
            dataset_page_size: 25,
            max_upload_bytes: None,
            user_agent: format!("vizier-client/{}", env!("CARGO_PKG_VERSION")),
            session_file: None,
        }
    }
}

impl ClientConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML
    ///
    /// # Errors
    /// `ClientError::Config` for malformed TOML
    pub fn from_toml_str(source: &str) -> Result<Self, ClientError> {
        toml::from_str(source).map_err(|e| ClientError::Config(e.to_string()))
    }

    /// Load from a TOML file and apply environment overrides
    ///
    /// # Errors
    /// `ClientError::Config` if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, ClientError> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| ClientError::Config(format!("{}: {e}", path.display())))?;
        Ok(Self::from_toml_str(&source)?.with_env_overrides())
    }

    /// Apply `VIZIER_API_URL` if set
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        match std::env::var(API_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => self.with_api_url(url),
            _ => self,
        }
    }

    /// With API root
    #[inline]
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// With request timeout
    #[inline]
    #[must_use]
    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// With poll interval
    #[inline]
    #[must_use]
    pub fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// With dataset page size
    #[inline]
    #[must_use]
    pub fn with_dataset_page_size(mut self, rows: u64) -> Self {
        self.dataset_page_size = rows;
        self
    }

    /// With upload size limit
    #[inline]
    #[must_use]
    pub fn with_max_upload_bytes(mut self, bytes: u64) -> Self {
        self.max_upload_bytes = Some(bytes);
        self
    }

    /// With session file
    #[inline]
    #[must_use]
    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = Some(path.into());
        self
    }

    /// Request timeout as a duration
    #[inline]
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Poll interval as a duration
    #[inline]
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ClientConfig::from_toml_str(
            r#"
            api_url = "http://vizier.example/api"
            poll_interval_ms = 250
            "#,
        )
        .unwrap();
        assert_eq!(config.api_url, "http://vizier.example/api");
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.dataset_page_size, 25);
        assert!(config.max_upload_bytes.is_none());
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        assert!(matches!(
            ClientConfig::from_toml_str("api_url = ["),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "dataset_page_size = 100").unwrap();
        let config = ClientConfig::load(file.path()).unwrap();
        assert_eq!(config.dataset_page_size, 100);
        assert!(ClientConfig::load(Path::new("/nonexistent/vizier.toml")).is_err());
    }

    #[test]
    fn builder_methods() {
        let config = ClientConfig::new()
            .with_max_upload_bytes(1024)
            .with_session_file("/tmp/session.json");
        assert_eq!(config.max_upload_bytes, Some(1024));
        assert!(config.session_file.is_some());
    }
}
