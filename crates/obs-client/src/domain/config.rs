//! Connection settings for an [`crate::ObsClient`].
//!
//! [`ConnectionConfig`] is a plain struct: it never reads files or
//! environment variables itself.  The binary fills it from CLI flags and an
//! optional TOML file (see [`crate::infrastructure::config_file`]); tests and
//! embedders build it directly.

use std::fmt;
use std::time::Duration;

use obs_core::protocol::event_subscription;

/// Default server address of the remote-control plugin.
pub const DEFAULT_URL: &str = "ws://localhost:4455";

/// All runtime settings for one client.
///
/// # Example
///
/// ```rust
/// use obs_client::ConnectionConfig;
///
/// let cfg = ConnectionConfig::new("ws://127.0.0.1:4455").with_password("secret");
/// assert_eq!(cfg.password(), Some("secret"));
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// WebSocket URL of the server, `ws://` or `wss://`.
    pub url: String,

    /// Shared secret for the challenge/response handshake.
    ///
    /// `None` and the empty string both mean "no password".
    pub password: Option<String>,

    /// Event categories requested in Identify.
    pub event_subscriptions: u32,

    /// Delay before the first reconnect attempt after a dial failure or a
    /// dropped connection.  Later attempts back off exponentially.
    pub reconnect_delay: Duration,

    /// Upper bound on the reconnect backoff.
    pub max_reconnect_delay: Duration,

    /// How long a request waits for its response.
    pub request_timeout: Duration,

    /// How long a dial may take before it counts as failed.
    pub connect_timeout: Duration,
}

impl ConnectionConfig {
    /// Defaults with a different server URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// The password, treating an empty string as absent.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }

    /// Checks the settings for values the client cannot work with.
    ///
    /// # Errors
    ///
    /// Returns a human-readable description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(format!(
                "url must start with ws:// or wss://, got '{}'",
                self.url
            ));
        }
        if self.reconnect_delay.is_zero() {
            return Err("reconnect delay must be greater than zero".to_string());
        }
        if self.max_reconnect_delay < self.reconnect_delay {
            return Err(format!(
                "max reconnect delay ({:?}) is shorter than the reconnect delay ({:?})",
                self.max_reconnect_delay, self.reconnect_delay
            ));
        }
        if self.request_timeout.is_zero() {
            return Err("request timeout must be greater than zero".to_string());
        }
        if self.connect_timeout.is_zero() {
            return Err("connect timeout must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl Default for ConnectionConfig {
    /// | Field                 | Default                  |
    /// |-----------------------|--------------------------|
    /// | url                   | `ws://localhost:4455`    |
    /// | password              | none                     |
    /// | event_subscriptions   | general, scenes, outputs |
    /// | reconnect_delay       | 5 seconds                |
    /// | max_reconnect_delay   | 60 seconds               |
    /// | request_timeout       | 10 seconds               |
    /// | connect_timeout       | 10 seconds               |
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            password: None,
            event_subscriptions: event_subscription::DEFAULT,
            reconnect_delay: Duration::from_secs(5),
            max_reconnect_delay: Duration::from_secs(60),
            request_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

// The password must never reach a log line.
impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("url", &self.url)
            .field("password", &self.password().map(|_| "<redacted>"))
            .field("event_subscriptions", &self.event_subscriptions)
            .field("reconnect_delay", &self.reconnect_delay)
            .field("max_reconnect_delay", &self.max_reconnect_delay)
            .field("request_timeout", &self.request_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
