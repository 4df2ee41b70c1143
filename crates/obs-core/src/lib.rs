//! # obs-core
//!
//! Shared protocol library for talking to a production tool (OBS Studio)
//! over its WebSocket control protocol, version 5.
//!
//! This crate has zero dependencies on sockets or async runtimes.  It only
//! describes *what* travels over the wire; the `obs-client` crate decides
//! *when* and *how* it travels.
//!
//! # Architecture overview
//!
//! Every message exchanged with the tool is a JSON text frame shaped as
//! `{"op": <integer>, "d": {...}}`.  The opcode says what the payload means:
//!
//! ```text
//! client                                   server
//! ──────                                   ──────
//!                          ◄── op 0  Hello (may carry an auth challenge)
//! op 1  Identify  ──►                          (rpcVersion, auth proof)
//!                          ◄── op 2  Identified
//! op 6  Request   ──►                          (requestType, requestId)
//!                          ◄── op 7/9 RequestResponse
//!                          ◄── op 5  Event (any time after Identified)
//! ```
//!
//! - **`protocol::messages`** – opcodes and typed payloads for each frame.
//! - **`protocol::codec`** – JSON encoding/decoding of the `{op, d}` envelope.
//! - **`protocol::auth`** – the salted, challenge-bound authentication proof.
//! - **`protocol::request_id`** – collision-free request identifiers.

pub mod protocol;

// Re-export the most-used items at the crate root so callers can write
// `obs_core::decode_message` instead of `obs_core::protocol::codec::decode_message`.
pub use protocol::auth::authentication_proof;
pub use protocol::codec::{decode_message, encode_message, Frame, ProtocolError};
pub use protocol::messages::{ClientMessage, OpCode, ServerMessage};
pub use protocol::request_id::RequestIdGenerator;
