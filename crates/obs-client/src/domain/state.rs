//! Connection state of a client.

use std::fmt;

/// Where a client is in its connection lifecycle.
///
/// ```text
/// Disconnected ──dial ok──► Connecting ──Identified──► Identified
///      ▲                        │                          │
///      └──── close / read error ┴──────────────────────────┘
/// ```
///
/// Only [`ConnectionState::Identified`] accepts requests; an open socket
/// that has not finished the handshake is still `Connecting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Identified,
}

impl ConnectionState {
    pub fn is_identified(self) -> bool {
        self == ConnectionState::Identified
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Identified => "identified",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_disconnected() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_only_identified_counts_as_identified() {
        assert!(ConnectionState::Identified.is_identified());
        assert!(!ConnectionState::Connecting.is_identified());
        assert!(!ConnectionState::Disconnected.is_identified());
    }

    #[test]
    fn test_display_is_lowercase() {
        assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
    }
}
