//! Application layer: the protocol logic of a client session, independent
//! of sockets.
//!
//! - [`handshake`] – answers Hello with Identify.
//! - [`correlator`] – matches responses to the callers awaiting them.
//! - [`dispatcher`] – routes events to registered handlers.
//! - [`backoff`] – reconnect delay schedule.

pub mod backoff;
pub mod correlator;
pub mod dispatcher;
pub mod handshake;
