//! Domain layer for obs-client.
//!
//! Pure types with no I/O: the connection settings and the connection
//! state machine's states.  Nothing here touches `tokio` or sockets.

pub mod config;
pub mod state;

pub use config::ConnectionConfig;
pub use state::ConnectionState;
