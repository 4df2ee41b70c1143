//! Builds the Identify reply to a server's Hello.
//!
//! The handshake is the first exchange on every connection:
//!
//! ```text
//! server ── Hello {rpcVersion, authentication?{challenge, salt}} ──► client
//! client ── Identify {rpcVersion, authentication?, eventSubscriptions} ──► server
//! server ── Identified ──► client
//! ```
//!
//! When the Hello carries a challenge and the client has a password, the
//! Identify carries the proof computed by [`obs_core::authentication_proof`].
//! Without a password the client identifies anyway; the server then decides
//! whether to reject the session.
//!
//! Nothing here logs the password, the challenge, or the proof.

use obs_core::authentication_proof;
use obs_core::protocol::{Hello, Identify, RPC_VERSION};
use tracing::{debug, warn};

/// Computes the Identify payload answering `hello`.
///
/// # Examples
///
/// ```rust
/// use obs_client::application::handshake::identify_for;
/// use obs_core::protocol::{AuthenticationChallenge, Hello};
///
/// let hello = Hello {
///     authentication: Some(AuthenticationChallenge {
///         challenge: "abc".to_string(),
///         salt: "def".to_string(),
///     }),
///     ..Hello::default()
/// };
/// let identify = identify_for(&hello, Some("secret"), 0);
/// assert_eq!(
///     identify.authentication.as_deref(),
///     Some("mi0p3v5/XQ3mb2qMxK0B6OOeFdqzUtSLRO5bxGlAPA4=")
/// );
/// ```
pub fn identify_for(hello: &Hello, password: Option<&str>, event_subscriptions: u32) -> Identify {
    if let Some(version) = &hello.obs_web_socket_version {
        debug!("server speaks obs-websocket {version}");
    }
    if let Some(rpc) = hello.rpc_version {
        if rpc != RPC_VERSION {
            debug!("server offers rpc version {rpc}, requesting {RPC_VERSION}");
        }
    }

    let authentication = match (&hello.authentication, password) {
        (Some(challenge), Some(password)) => Some(authentication_proof(
            password,
            &challenge.salt,
            &challenge.challenge,
        )),
        (Some(_), None) => {
            warn!("server requires authentication but no password is configured");
            None
        }
        (None, _) => None,
    };

    Identify {
        rpc_version: RPC_VERSION,
        authentication,
        event_subscriptions,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use obs_core::protocol::{event_subscription, AuthenticationChallenge};

    fn hello_with_challenge() -> Hello {
        Hello {
            obs_web_socket_version: Some("5.0.0".to_string()),
            rpc_version: Some(1),
            authentication: Some(AuthenticationChallenge {
                challenge: "abc".to_string(),
                salt: "def".to_string(),
            }),
        }
    }

    #[test]
    fn test_challenge_with_password_includes_proof() {
        // Arrange
        let hello = hello_with_challenge();

        // Act
        let identify = identify_for(&hello, Some("secret"), event_subscription::DEFAULT);

        // Assert
        assert_eq!(identify.rpc_version, 1);
        assert_eq!(
            identify.authentication.as_deref(),
            Some("mi0p3v5/XQ3mb2qMxK0B6OOeFdqzUtSLRO5bxGlAPA4=")
        );
        assert_eq!(identify.event_subscriptions, event_subscription::DEFAULT);
    }

    #[test]
    fn test_challenge_without_password_omits_proof() {
        let identify = identify_for(&hello_with_challenge(), None, 0);
        assert!(identify.authentication.is_none());
    }

    #[test]
    fn test_no_challenge_ignores_password() {
        let hello = Hello {
            rpc_version: Some(1),
            ..Hello::default()
        };

        let identify = identify_for(&hello, Some("secret"), 0);

        assert!(identify.authentication.is_none());
    }

    #[test]
    fn test_always_requests_supported_rpc_version() {
        let hello = Hello {
            rpc_version: Some(7),
            ..Hello::default()
        };
        assert_eq!(identify_for(&hello, None, 0).rpc_version, RPC_VERSION);
    }
}
