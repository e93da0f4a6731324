//! Configuration for the Tally sync service
//!
//! Loads and validates `tally.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tally_common::{Result, SyncError};

/// Configuration for the sync service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Base URL of the REST backend, e.g. `http://localhost:3000/api`
    pub api_base_url: String,

    /// Opaque user identity forwarded with every remote call
    pub user_id: String,

    /// SQLite file holding the canonical local store
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// SQLite file holding the pending action log.
    /// Kept separate from `db_path`: losing it loses only unsynced work.
    #[serde(default = "default_queue_path")]
    pub queue_path: PathBuf,

    /// Periodic sync interval while online (seconds)
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,

    /// Per-request timeout for remote calls (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// First backoff delay after a transient failure (seconds)
    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: u64,

    /// Upper bound on the exponential backoff delay (seconds)
    #[serde(default = "default_backoff_cap_secs")]
    pub backoff_cap_secs: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("tally.db")
}
fn default_queue_path() -> PathBuf {
    PathBuf::from("tally-queue.db")
}
fn default_sync_interval_secs() -> u64 {
    30
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_backoff_base_secs() -> u64 {
    2
}
fn default_backoff_cap_secs() -> u64 {
    300
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000/api".to_string(),
            user_id: String::new(),
            db_path: default_db_path(),
            queue_path: default_queue_path(),
            sync_interval_secs: default_sync_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            backoff_base_secs: default_backoff_base_secs(),
            backoff_cap_secs: default_backoff_cap_secs(),
        }
    }
}

impl SyncConfig {
    /// Load config from a TOML file.
    pub fn from_toml(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self =
            toml::from_str(&content).map_err(|e| SyncError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Validate configuration before wiring up the service.
    pub fn validate(&self) -> Result<()> {
        if self.user_id.is_empty() {
            return Err(SyncError::Config("user_id cannot be empty".into()));
        }
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://")
        {
            return Err(SyncError::Config(
                "api_base_url must start with http:// or https://".into(),
            ));
        }
        if self.backoff_base_secs == 0 {
            return Err(SyncError::Config(
                "backoff_base_secs must be at least 1".into(),
            ));
        }
        if self.backoff_cap_secs < self.backoff_base_secs {
            return Err(SyncError::Config(
                "backoff_cap_secs must be >= backoff_base_secs".into(),
            ));
        }
        Ok(())
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn defaults_validate_once_user_is_set() {
        let mut config = SyncConfig::default();
        assert!(config.validate().is_err());
        config.user_id = "u1".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_bad_base_url() {
        let config = SyncConfig {
            api_base_url: "ftp://example.com".to_string(),
            user_id: "u1".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn loads_from_toml_with_defaults() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("tally.toml");
        file.write_str(
            r#"
api_base_url = "https://habits.example.com/api"
user_id = "u42"
sync_interval_secs = 10
"#,
        )
        .unwrap();

        let config = SyncConfig::from_toml(file.path()).unwrap();
        assert_eq!(config.user_id, "u42");
        assert_eq!(config.sync_interval_secs, 10);
        assert_eq!(config.request_timeout_secs, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = SyncConfig::from_toml("/nonexistent/tally.toml").unwrap_err();
        assert!(matches!(err, SyncError::Io(_)));
    }
}
