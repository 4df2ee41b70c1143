//! Protocol module containing message types, the JSON frame codec, and the
//! authentication helper.

pub mod auth;
pub mod codec;
pub mod messages;
pub mod request_id;
pub mod requests;

pub use auth::authentication_proof;
pub use codec::{decode_message, encode_message, Frame, ProtocolError};
pub use messages::*;
pub use request_id::RequestIdGenerator;
