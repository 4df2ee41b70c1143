//! All control-protocol message types.
//!
//! Field names on the wire are camelCase; the `#[serde(rename_all)]`
//! attributes map them onto snake_case Rust fields.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Protocol constants ────────────────────────────────────────────────────────

/// RPC version sent in every Identify.
pub const RPC_VERSION: u32 = 1;

// ── Opcodes ───────────────────────────────────────────────────────────────────

/// Frame opcodes this client understands.
///
/// Opcodes 7 and 9 are both treated as "a response" by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    Hello = 0,
    Identify = 1,
    Identified = 2,
    Event = 5,
    Request = 6,
    RequestResponse = 7,
    RequestBatchResponse = 9,
}

impl TryFrom<u8> for OpCode {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0 => Ok(OpCode::Hello),
            1 => Ok(OpCode::Identify),
            2 => Ok(OpCode::Identified),
            5 => Ok(OpCode::Event),
            6 => Ok(OpCode::Request),
            7 => Ok(OpCode::RequestResponse),
            9 => Ok(OpCode::RequestBatchResponse),
            _ => Err(()),
        }
    }
}

// ── Handshake payloads ────────────────────────────────────────────────────────

/// HELLO (op 0): first frame sent by the server after the socket opens.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hello {
    /// Server plugin version, informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obs_web_socket_version: Option<String>,
    /// Latest RPC version the server supports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_version: Option<u32>,
    /// Present only when the server requires authentication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<AuthenticationChallenge>,
}

/// Single-use values the server issues for building the auth proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationChallenge {
    pub challenge: String,
    pub salt: String,
}

/// IDENTIFY (op 1): the client's reply to Hello.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identify {
    pub rpc_version: u32,
    /// Omitted entirely when the server did not ask for authentication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<String>,
    /// Bitmask of [`event_subscription`] flags.
    pub event_subscriptions: u32,
}

/// IDENTIFIED (op 2): the handshake is complete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identified {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negotiated_rpc_version: Option<u32>,
}

/// Event subscription bitmask flags used in [`Identify::event_subscriptions`].
pub mod event_subscription {
    pub const NONE: u32 = 0;
    pub const GENERAL: u32 = 1 << 0;
    pub const CONFIG: u32 = 1 << 1;
    pub const SCENES: u32 = 1 << 2;
    pub const INPUTS: u32 = 1 << 3;
    pub const TRANSITIONS: u32 = 1 << 4;
    pub const FILTERS: u32 = 1 << 5;
    pub const OUTPUTS: u32 = 1 << 6;
    pub const SCENE_ITEMS: u32 = 1 << 7;
    pub const MEDIA_INPUTS: u32 = 1 << 8;
    pub const VENDORS: u32 = 1 << 9;
    pub const UI: u32 = 1 << 10;

    /// Every low-volume category.
    pub const ALL: u32 = GENERAL
        | CONFIG
        | SCENES
        | INPUTS
        | TRANSITIONS
        | FILTERS
        | OUTPUTS
        | SCENE_ITEMS
        | MEDIA_INPUTS
        | VENDORS
        | UI;

    /// Categories carrying the events a recording controller reacts to:
    /// `ExitStarted`, `CurrentProgramSceneChanged` and `RecordStateChanged`.
    pub const DEFAULT: u32 = GENERAL | SCENES | OUTPUTS;
}

// ── Event payload ─────────────────────────────────────────────────────────────

/// EVENT (op 5): an unsolicited notification from the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Empty when the server omitted the field; such events are not dispatched.
    #[serde(default)]
    pub event_type: String,
    #[serde(default)]
    pub event_data: Value,
}

// ── Request / response payloads ───────────────────────────────────────────────

/// REQUEST (op 6): a call the client wants the server to perform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub request_type: String,
    pub request_id: String,
    /// Serialized as `null` when the request carries no arguments.
    pub request_data: Option<Value>,
}

/// Outcome block attached to every response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestStatus {
    pub result: bool,
    pub code: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// REQUEST_RESPONSE (op 7) and REQUEST_BATCH_RESPONSE (op 9).
///
/// Both opcodes decode into this one shape; a batch response additionally
/// carries `results`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_type: Option<String>,
    /// Empty when the server omitted the field; such a response matches nothing.
    #[serde(default)]
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_status: Option<RequestStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<Value>>,
}

impl RequestResponse {
    /// Returns the failure status if the server reported one.
    ///
    /// A response without a status block counts as success.
    pub fn failure(&self) -> Option<&RequestStatus> {
        self.request_status.as_ref().filter(|status| !status.result)
    }
}

// ── Top-level message enums ───────────────────────────────────────────────────

/// Frames the client sends.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Identify(Identify),
    Request(Request),
}

impl ClientMessage {
    /// Returns the opcode this message is framed with.
    pub fn op_code(&self) -> OpCode {
        match self {
            ClientMessage::Identify(_) => OpCode::Identify,
            ClientMessage::Request(_) => OpCode::Request,
        }
    }
}

/// Frames the client receives.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Hello(Hello),
    Identified(Identified),
    Event(Event),
    RequestResponse(RequestResponse),
    RequestBatchResponse(RequestResponse),
    /// A well-formed frame whose opcode the client does not act on.
    Unsupported { op: i64 },
}

impl ServerMessage {
    /// Short name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Hello(_) => "Hello",
            ServerMessage::Identified(_) => "Identified",
            ServerMessage::Event(_) => "Event",
            ServerMessage::RequestResponse(_) => "RequestResponse",
            ServerMessage::RequestBatchResponse(_) => "RequestBatchResponse",
            ServerMessage::Unsupported { .. } => "Unsupported",
        }
    }
}
