//! Errors visible to callers of [`crate::ObsClient`].
//!
//! Connection-level failures (dial errors, malformed frames, dropped sockets)
//! are recovered inside the client by tearing the connection down and
//! retrying.  The only place a failure reaches the caller is the result of a
//! request, so this enum describes why a request did not produce a response.

use std::time::Duration;

use obs_core::ProtocolError;
use thiserror::Error;

use crate::infrastructure::transport::TransportError;

/// Why a request (or a wait for the handshake) failed.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The handshake has not completed, so no request can be issued.
    #[error("not connected: the handshake with the server has not completed")]
    NotConnected,

    /// The frame could not be written to the socket.
    #[error("transport error: {0}")]
    Transport(String),

    /// The connection was torn down while the request was in flight.
    #[error("connection closed before a response arrived")]
    ConnectionClosed,

    /// No response arrived within the configured request timeout.
    #[error("request {request_type} timed out after {timeout:?}")]
    Timeout {
        request_type: String,
        timeout: Duration,
    },

    /// The handshake did not complete in time.
    #[error("handshake did not complete within {0:?}")]
    HandshakeTimeout(Duration),

    /// The server answered with `requestStatus.result == false`.
    #[error("request {request_type} failed with code {code}: {comment}")]
    RequestFailed {
        request_type: String,
        code: u32,
        comment: String,
    },

    /// The response arrived but did not have the expected shape.
    #[error("unexpected response to {request_type}: {reason}")]
    UnexpectedResponse {
        request_type: String,
        reason: String,
    },

    /// A request identifier was already live in the pending table.
    #[error("request id {0} is already in flight")]
    DuplicateRequestId(String),

    /// The request could not be encoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Encode(e) => ClientError::Protocol(e),
            other => ClientError::Transport(other.to_string()),
        }
    }
}
