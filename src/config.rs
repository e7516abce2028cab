//! Configuration Management
//!
//! Persistent settings for gcp-toolbox, read from
//! `<config_dir>/gcp-toolbox/config.json`. Command-line flags override them.

use crate::gcp::client::Endpoints;
use crate::ops::{Limits, DEFAULT_CALL_TIMEOUT, DEFAULT_MAX_IN_FLIGHT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

fn default_request_timeout_secs() -> u64 {
    DEFAULT_CALL_TIMEOUT.as_secs()
}

fn default_max_concurrent_scopes() -> usize {
    DEFAULT_MAX_IN_FLIGHT
}

/// User configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Service account key or ADC file; discovery is used when unset
    #[serde(default)]
    pub credentials_file: Option<PathBuf>,
    /// Timeout for each provider call
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Zone/region sub-calls in flight at once
    #[serde(default = "default_max_concurrent_scopes")]
    pub max_concurrent_scopes: usize,
    #[serde(default)]
    pub compute_endpoint: Option<String>,
    #[serde(default)]
    pub storage_endpoint: Option<String>,
    #[serde(default)]
    pub billing_endpoint: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credentials_file: None,
            request_timeout_secs: default_request_timeout_secs(),
            max_concurrent_scopes: default_max_concurrent_scopes(),
            compute_endpoint: None,
            storage_endpoint: None,
            billing_endpoint: None,
        }
    }
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("gcp-toolbox").join("config.json"))
    }

    /// Load configuration from the default location
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load configuration from `path`; a missing or unreadable file yields defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring invalid config {:?}: {}", path, e);
                Self::default()
            }),
            Err(e) => {
                tracing::warn!("Failed to read config {:?}: {}", path, e);
                Self::default()
            },
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn limits(&self) -> Limits {
        Limits {
            call_timeout: self.request_timeout(),
            max_in_flight: self.max_concurrent_scopes.max(1),
        }
    }

    /// API base URLs with any configured overrides applied
    pub fn endpoints(&self) -> Endpoints {
        let defaults = Endpoints::default();
        Endpoints {
            compute: self.compute_endpoint.clone().unwrap_or(defaults.compute),
            storage: self.storage_endpoint.clone().unwrap_or(defaults.storage),
            billing: self.billing_endpoint.clone().unwrap_or(defaults.billing),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json"));
        assert_eq!(config, Config::default());
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.limits().max_in_flight, 8);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"max_concurrent_scopes": 3, "compute_endpoint": "http://127.0.0.1:9000"}"#,
        )
        .unwrap();

        let config = Config::load_from(&path);
        assert_eq!(config.max_concurrent_scopes, 3);
        assert_eq!(config.request_timeout_secs, 30);

        let endpoints = config.endpoints();
        assert_eq!(endpoints.compute, "http://127.0.0.1:9000");
        assert_eq!(endpoints.storage, Endpoints::default().storage);
    }

    #[test]
    fn test_invalid_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn test_zero_limits_are_clamped() {
        let config = Config {
            request_timeout_secs: 0,
            max_concurrent_scopes: 0,
            ..Config::default()
        };
        let limits = config.limits();
        assert_eq!(limits.call_timeout, Duration::from_secs(1));
        assert_eq!(limits.max_in_flight, 1);
    }
}
