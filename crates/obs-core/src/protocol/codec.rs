//! JSON codec for the `{op, d}` frame envelope.
//!
//! Wire format (one WebSocket text message per frame):
//! ```text
//! {"op": <opcode>, "d": { ...payload... }}
//! ```
//! The opcode selects how `d` is interpreted; see [`OpCode`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::trace;

use crate::protocol::messages::{ClientMessage, OpCode, ServerMessage};

/// Errors that can occur during frame encoding or decoding.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The text is not a JSON object of the shape `{op, d}`.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// The opcode is known but `d` does not match its payload shape.
    #[error("malformed {op:?} payload: {reason}")]
    MalformedPayload { op: OpCode, reason: String },

    /// A payload could not be serialized.
    #[error("failed to encode {op:?} frame: {reason}")]
    Encode { op: OpCode, reason: String },
}

/// The raw envelope every frame travels in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub op: i64,
    #[serde(default)]
    pub d: Value,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a [`ClientMessage`] into the JSON text of one frame.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if the payload cannot be serialized.
///
/// # Examples
///
/// ```rust
/// use obs_core::protocol::{encode_message, ClientMessage, Identify};
///
/// let msg = ClientMessage::Identify(Identify {
///     rpc_version: 1,
///     authentication: None,
///     event_subscriptions: 0,
/// });
/// let text = encode_message(&msg).unwrap();
/// let value: serde_json::Value = serde_json::from_str(&text).unwrap();
/// assert_eq!(value, serde_json::json!({"op": 1, "d": {"rpcVersion": 1, "eventSubscriptions": 0}}));
/// ```
pub fn encode_message(msg: &ClientMessage) -> Result<String, ProtocolError> {
    let op = msg.op_code();
    let payload = match msg {
        ClientMessage::Identify(identify) => serde_json::to_value(identify),
        ClientMessage::Request(request) => serde_json::to_value(request),
    }
    .map_err(|e| ProtocolError::Encode {
        op,
        reason: e.to_string(),
    })?;

    let frame = Frame {
        op: i64::from(op as u8),
        d: payload,
    };
    serde_json::to_string(&frame).map_err(|e| ProtocolError::Encode {
        op,
        reason: e.to_string(),
    })
}

/// Decodes the JSON text of one inbound frame.
///
/// Frames with opcodes the client never acts on (including client-only
/// opcodes echoed back) decode to [`ServerMessage::Unsupported`] rather
/// than failing, so the connection survives protocol additions.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidFrame`] if the text is not an `{op, d}`
/// object, or [`ProtocolError::MalformedPayload`] if `d` does not fit the
/// opcode's payload.
///
/// # Examples
///
/// ```rust
/// use obs_core::protocol::{decode_message, ServerMessage};
///
/// let msg = decode_message(r#"{"op":2,"d":{"negotiatedRpcVersion":1}}"#).unwrap();
/// assert!(matches!(msg, ServerMessage::Identified(_)));
/// ```
pub fn decode_message(text: &str) -> Result<ServerMessage, ProtocolError> {
    let frame: Frame =
        serde_json::from_str(text).map_err(|e| ProtocolError::InvalidFrame(e.to_string()))?;

    // Opcodes outside u8 are just as unknown as an unassigned u8.
    let known = u8::try_from(frame.op)
        .ok()
        .and_then(|op| OpCode::try_from(op).ok());
    let op = match known {
        Some(op) => op,
        None => {
            trace!("ignoring frame with unknown opcode {}", frame.op);
            return Ok(ServerMessage::Unsupported { op: frame.op });
        }
    };

    // `{}` and a missing/null `d` are equivalent for every payload we parse.
    let payload = match frame.d {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };

    match op {
        OpCode::Hello => parse(op, payload).map(ServerMessage::Hello),
        OpCode::Identified => parse(op, payload).map(ServerMessage::Identified),
        OpCode::Event => parse(op, payload).map(ServerMessage::Event),
        OpCode::RequestResponse => parse(op, payload).map(ServerMessage::RequestResponse),
        OpCode::RequestBatchResponse => {
            parse(op, payload).map(ServerMessage::RequestBatchResponse)
        }
        OpCode::Identify | OpCode::Request => Ok(ServerMessage::Unsupported { op: frame.op }),
    }
}

fn parse<T: serde::de::DeserializeOwned>(op: OpCode, payload: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(payload).map_err(|e| ProtocolError::MalformedPayload {
        op,
        reason: e.to_string(),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
