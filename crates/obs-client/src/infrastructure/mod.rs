//! Infrastructure layer for obs-client.
//!
//! Everything that performs I/O or owns a background task lives here.
//!
//! # Responsibilities
//!
//! - Dialling the server and moving whole frames over the WebSocket
//! - Scheduling reconnect attempts
//! - Reading the `obs-ctl` configuration file
//!
//! # What does NOT belong here?
//!
//! - Handshake, correlation and event routing rules (application layer)
//! - Connection settings and states (domain layer)

pub mod config_file;
pub mod reconnect;
pub mod transport;
