//! # obs-client
//!
//! Asynchronous control client for a production tool (OBS Studio) speaking
//! the WebSocket control protocol, version 5.
//!
//! The client dials the server, completes the Hello → Identify → Identified
//! handshake (answering an authentication challenge when a password is
//! configured), issues requests with per-call timeouts, routes unsolicited
//! events to registered handlers, and reconnects on its own after a dropped
//! connection.
//!
//! # Architecture overview
//!
//! ```text
//! obs-client
//!   domain/          ConnectionConfig, ConnectionState (no I/O)
//!   application/     handshake, pending-call table, event handlers, backoff
//!   infrastructure/  WebSocket transport, reconnect supervisor, config file
//!   client.rs        ObsClient facade tying the layers together
//!       ↕
//! obs-core           frame codec, message types, authentication proof
//! ```
//!
//! Start with [`ObsClient`].

pub mod application;
pub mod client;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use client::ObsClient;
pub use domain::{ConnectionConfig, ConnectionState};
pub use error::ClientError;
