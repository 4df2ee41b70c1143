//! TOML configuration file for `obs-ctl`.
//!
//! Every field is optional; a missing file section or key falls back to the
//! [`ConnectionConfig`] defaults.
//!
//! ```toml
//! log_level = "info"
//!
//! [obs]
//! url = "ws://localhost:4455"
//! password = "secret"
//! event_subscriptions = 69
//! reconnect_delay_secs = 5
//! max_reconnect_delay_secs = 60
//! request_timeout_secs = 10
//! connect_timeout_secs = 10
//! ```
//!
//! # Serde default values
//!
//! Fields annotated with `#[serde(default = "some_fn")]` take the value of
//! `some_fn()` when absent, so a partial file (or an empty one) is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ConnectionConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level file contents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileConfig {
    /// `tracing` level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub obs: ObsSection,
}

/// The `[obs]` table.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct ObsSection {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default = "default_event_subscriptions")]
    pub event_subscriptions: u32,
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
    #[serde(default = "default_max_reconnect_delay_secs")]
    pub max_reconnect_delay_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

// ── Default value functions ───────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_url() -> String {
    ConnectionConfig::default().url
}
fn default_event_subscriptions() -> u32 {
    ConnectionConfig::default().event_subscriptions
}
fn default_reconnect_delay_secs() -> u64 {
    ConnectionConfig::default().reconnect_delay.as_secs()
}
fn default_max_reconnect_delay_secs() -> u64 {
    ConnectionConfig::default().max_reconnect_delay.as_secs()
}
fn default_request_timeout_secs() -> u64 {
    ConnectionConfig::default().request_timeout.as_secs()
}
fn default_connect_timeout_secs() -> u64 {
    ConnectionConfig::default().connect_timeout.as_secs()
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            obs: ObsSection::default(),
        }
    }
}

impl Default for ObsSection {
    fn default() -> Self {
        Self {
            url: default_url(),
            password: None,
            event_subscriptions: default_event_subscriptions(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
            max_reconnect_delay_secs: default_max_reconnect_delay_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for ObsSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObsSection")
            .field("url", &self.url)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("event_subscriptions", &self.event_subscriptions)
            .finish_non_exhaustive()
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl FileConfig {
    /// Reads and parses the file at `path`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file cannot be read, [`ConfigError::Parse`]
    /// if it is not valid TOML for this schema.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Converts the `[obs]` table into a validated [`ConnectionConfig`].
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] if the resulting settings are unusable.
    pub fn to_connection_config(&self) -> Result<ConnectionConfig, ConfigError> {
        let obs = &self.obs;
        let cfg = ConnectionConfig {
            url: obs.url.clone(),
            password: obs.password.clone(),
            event_subscriptions: obs.event_subscriptions,
            reconnect_delay: Duration::from_secs(obs.reconnect_delay_secs),
            max_reconnect_delay: Duration::from_secs(obs.max_reconnect_delay_secs),
            request_timeout: Duration::from_secs(obs.request_timeout_secs),
            connect_timeout: Duration::from_secs(obs.connect_timeout_secs),
        };
        cfg.validate().map_err(ConfigError::Invalid)?;
        Ok(cfg)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
