//! The client facade: connection lifecycle, requests, and event handlers.
//!
//! # Concurrency model
//!
//! An [`ObsClient`] is a cheap handle around shared state; clone it freely
//! and call it from any task.  Inside, four things run or wait:
//!
//! ```text
//!  callers ──send_request──► link lock ──► FrameWriter ──► server
//!     ▲                                                       │
//!     │ oneshot                                               ▼
//!  PendingCalls ◄──RequestResponse── reader task ◄── FrameReader
//!                                        │
//!                                        └─Event──► event task ──► handlers
//! ```
//!
//! - The **link lock** (`tokio::sync::Mutex<Link>`) owns the write half,
//!   the reader task handle, and a generation counter.  Every state
//!   transition happens while holding it.  `connect` keeps it for the whole
//!   dial, so `close()` may wait up to `connect_timeout` behind an
//!   in-flight dial.
//! - The **reader task** is spawned per connection.  It answers Hello,
//!   marks the connection Identified, routes responses, and queues events.
//!   When it stops reading for any reason it tears the connection down and
//!   asks the reconnect supervisor for one retry.
//! - The **event task** runs handlers one at a time, in arrival order, so a
//!   slow handler never stalls the reader.
//! - The **reconnect supervisor** keeps at most one retry pending.
//!
//! # Generations
//!
//! Each successful dial increments the generation, and `close` increments
//! it too.  A reader or retry remembers the generation it belongs to and
//! becomes a no-op once the link has moved on, which is how a stale reader
//! exiting after `close` avoids scheduling a reconnect.

use std::sync::{Arc, Weak};
use std::time::Duration;

use obs_core::protocol::requests::{self, RecordStatus, SceneList, SetCurrentProgramScene};
use obs_core::protocol::{Event, Request, RequestResponse};
use obs_core::{ClientMessage, OpCode, ProtocolError, RequestIdGenerator, ServerMessage};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::application::backoff::BackoffPolicy;
use crate::application::correlator::PendingCalls;
use crate::application::dispatcher::EventHandlers;
use crate::application::handshake;
use crate::domain::{ConnectionConfig, ConnectionState};
use crate::error::ClientError;
use crate::infrastructure::reconnect::ReconnectSupervisor;
use crate::infrastructure::transport::{self, FrameReader, FrameWriter};

/// Handle to one logical connection with the server.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use obs_client::{ConnectionConfig, ObsClient};
///
/// # async fn example() -> Result<(), obs_client::ClientError> {
/// let client = ObsClient::new(ConnectionConfig::new("ws://localhost:4455"));
/// client.on_event("RecordStateChanged", |data| println!("recording: {data}"));
/// client.connect().await;
/// client.wait_until_identified(Duration::from_secs(5)).await?;
///
/// client.start_recording().await?;
/// for scene in client.list_scenes().await? {
///     println!("{scene}");
/// }
/// client.close().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ObsClient {
    shared: Arc<Shared>,
}

struct Shared {
    config: ConnectionConfig,
    link: Mutex<Link>,
    state: watch::Sender<ConnectionState>,
    pending: PendingCalls,
    handlers: EventHandlers,
    request_ids: RequestIdGenerator,
    reconnect: ReconnectSupervisor,
}

#[derive(Default)]
struct Link {
    writer: Option<FrameWriter>,
    reader: Option<JoinHandle<()>>,
    generation: u64,
}

impl ObsClient {
    /// Creates a disconnected client.  Nothing happens on the network until
    /// [`ObsClient::connect`] is called.
    pub fn new(config: ConnectionConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let reconnect = ReconnectSupervisor::new(BackoffPolicy::from_config(&config));
        Self {
            shared: Arc::new(Shared {
                config,
                link: Mutex::new(Link::default()),
                state,
                pending: PendingCalls::new(),
                handlers: EventHandlers::new(),
                request_ids: RequestIdGenerator::new(),
                reconnect,
            }),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.shared.config
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Dials the server and starts the handshake.
    ///
    /// Returns once the socket is open (or the dial has failed); the
    /// handshake finishes in the background, see
    /// [`ObsClient::wait_until_identified`].  A failed dial is logged and
    /// retried after the reconnect delay.  Calling this while a connection
    /// is open does nothing.
    pub async fn connect(&self) {
        self.shared.connect(None).await;
    }

    /// Closes the connection and stops reconnecting.
    ///
    /// Requests still waiting for a response fail with
    /// [`ClientError::ConnectionClosed`].  Safe to call repeatedly and on a
    /// client that never connected.
    pub async fn close(&self) {
        self.shared.close().await;
    }

    /// `true` only once the handshake has completed.
    pub fn is_connected(&self) -> bool {
        self.state().is_identified()
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Waits until the handshake completes.
    ///
    /// # Errors
    ///
    /// [`ClientError::HandshakeTimeout`] if it does not complete within
    /// `limit`.
    pub async fn wait_until_identified(&self, limit: Duration) -> Result<(), ClientError> {
        let mut state = self.shared.state.subscribe();
        // The watch::Ref borrows `state`; drop it before leaving the future.
        let waited = tokio::time::timeout(limit, async {
            state.wait_for(|s| s.is_identified()).await.map(drop)
        })
        .await;
        match waited {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(ClientError::ConnectionClosed),
            Err(_) => Err(ClientError::HandshakeTimeout(limit)),
        }
    }

    /// `true` while a reconnect attempt is scheduled but has not started.
    pub fn reconnect_pending(&self) -> bool {
        self.shared.reconnect.is_pending()
    }

    /// Number of requests awaiting a response.
    pub fn pending_requests(&self) -> usize {
        self.shared.pending.len()
    }

    // ── Requests ──────────────────────────────────────────────────────────────

    /// Sends `request_type` and waits for its response.
    ///
    /// # Errors
    ///
    /// - [`ClientError::NotConnected`] immediately if the handshake has not
    ///   completed.
    /// - [`ClientError::Timeout`] if no response arrives within the
    ///   configured request timeout.
    /// - [`ClientError::ConnectionClosed`] if the connection drops first.
    /// - [`ClientError::RequestFailed`] if the server reports a failure.
    pub async fn send_request(
        &self,
        request_type: &str,
        request_data: Option<Value>,
    ) -> Result<RequestResponse, ClientError> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }
        let shared = &self.shared;

        let request_id = shared.request_ids.next();
        let response_rx = shared
            .pending
            .register(&request_id)
            .ok_or_else(|| ClientError::DuplicateRequestId(request_id.clone()))?;

        let frame = ClientMessage::Request(Request {
            request_type: request_type.to_string(),
            request_id: request_id.clone(),
            request_data,
        });
        if let Err(e) = shared.write_when_identified(&frame).await {
            shared.pending.forget(&request_id);
            return Err(e);
        }
        debug!("sent {request_type} as request {request_id}");

        let timeout = shared.config.request_timeout;
        let response = match tokio::time::timeout(timeout, response_rx).await {
            Ok(Ok(outcome)) => outcome?,
            Ok(Err(_)) => return Err(ClientError::ConnectionClosed),
            Err(_) => {
                shared.pending.forget(&request_id);
                return Err(ClientError::Timeout {
                    request_type: request_type.to_string(),
                    timeout,
                });
            }
        };

        if let Some(status) = response.failure() {
            return Err(ClientError::RequestFailed {
                request_type: request_type.to_string(),
                code: status.code,
                comment: status.comment.clone().unwrap_or_default(),
            });
        }
        Ok(response)
    }

    pub async fn start_recording(&self) -> Result<(), ClientError> {
        self.send_request(requests::START_RECORD, None)
            .await
            .map(drop)
    }

    pub async fn stop_recording(&self) -> Result<(), ClientError> {
        self.send_request(requests::STOP_RECORD, None)
            .await
            .map(drop)
    }

    /// Full `GetRecordStatus` response.
    pub async fn record_status(&self) -> Result<RecordStatus, ClientError> {
        self.request_typed(requests::GET_RECORD_STATUS, None).await
    }

    /// Whether the recording output is active.
    pub async fn is_recording(&self) -> Result<bool, ClientError> {
        Ok(self.record_status().await?.output_active)
    }

    /// Switches the program output to `scene_name`.
    pub async fn set_current_scene(&self, scene_name: &str) -> Result<(), ClientError> {
        let data = serde_json::to_value(SetCurrentProgramScene {
            scene_name: scene_name.to_string(),
        })
        .map_err(|e| ProtocolError::Encode {
            op: OpCode::Request,
            reason: e.to_string(),
        })?;
        self.send_request(requests::SET_CURRENT_PROGRAM_SCENE, Some(data))
            .await
            .map(drop)
    }

    /// Scene names in the order the server lists them.
    pub async fn list_scenes(&self) -> Result<Vec<String>, ClientError> {
        let list: SceneList = self.request_typed(requests::GET_SCENE_LIST, None).await?;
        Ok(list.names())
    }

    async fn request_typed<T: DeserializeOwned>(
        &self,
        request_type: &str,
        request_data: Option<Value>,
    ) -> Result<T, ClientError> {
        let response = self.send_request(request_type, request_data).await?;
        let data = response
            .response_data
            .ok_or_else(|| ClientError::UnexpectedResponse {
                request_type: request_type.to_string(),
                reason: "response carries no responseData".to_string(),
            })?;
        serde_json::from_value(data).map_err(|e| ClientError::UnexpectedResponse {
            request_type: request_type.to_string(),
            reason: e.to_string(),
        })
    }

    // ── Events ────────────────────────────────────────────────────────────────

    /// Registers `handler` for events of `event_type`, replacing any previous
    /// handler for that type.  Handlers stay registered across reconnects.
    ///
    /// The handler runs on the client's event task; keep it short.
    pub fn on_event<F>(&self, event_type: impl Into<String>, handler: F)
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        let event_type = event_type.into();
        if self.shared.handlers.set(event_type.clone(), Arc::new(handler)) {
            debug!("replaced handler for {event_type}");
        }
    }

    /// Unregisters the handler for `event_type`.  Returns whether one existed.
    pub fn remove_event_handler(&self, event_type: &str) -> bool {
        self.shared.handlers.remove(event_type)
    }
}

impl std::fmt::Debug for ObsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObsClient")
            .field("url", &self.shared.config.url)
            .field("state", &self.state())
            .field("pending_requests", &self.pending_requests())
            .finish()
    }
}

// ── Connection management ─────────────────────────────────────────────────────

impl Shared {
    /// Dials unless a connection is already open.
    ///
    /// `expected_generation` is set by reconnect attempts: if the link has
    /// moved on since the retry was scheduled (a `close`, or a manual
    /// `connect` that won the race), the attempt is abandoned.
    async fn connect(self: &Arc<Self>, expected_generation: Option<u64>) {
        let mut link = self.link.lock().await;
        if let Some(expected) = expected_generation {
            if link.generation != expected {
                debug!("reconnect attempt superseded; skipping");
                return;
            }
        }
        if link.writer.is_some() {
            debug!("already connected to {}", self.config.url);
            return;
        }

        info!("connecting to {}", self.config.url);
        match transport::dial(&self.config.url, self.config.connect_timeout).await {
            Ok((writer, reader)) => {
                link.generation = link.generation.wrapping_add(1);
                let generation = link.generation;
                link.writer = Some(writer);
                self.state.send_replace(ConnectionState::Connecting);

                let events = spawn_event_task(Arc::downgrade(self));
                link.reader = Some(tokio::spawn(read_loop(
                    Arc::downgrade(self),
                    reader,
                    events,
                    generation,
                )));
                debug!("transport open (generation {generation}), waiting for Hello");
            }
            Err(e) => {
                warn!("{e}");
                self.schedule_reconnect(link.generation);
            }
        }
    }

    async fn close(&self) {
        let writer = {
            let mut link = self.link.lock().await;
            link.generation = link.generation.wrapping_add(1);
            self.reconnect.cancel();
            if let Some(reader) = link.reader.take() {
                reader.abort();
            }
            self.state.send_replace(ConnectionState::Disconnected);
            let failed = self.pending.fail_all(|| ClientError::ConnectionClosed);
            if failed > 0 {
                debug!("failed {failed} pending request(s) on close");
            }
            link.writer.take()
        };

        if let Some(writer) = writer {
            writer.close().await;
            info!("closed connection to {}", self.config.url);
        }
    }

    /// Tears down a connection whose reader has stopped and schedules one
    /// reconnect.  A no-op for a generation that is no longer current.
    async fn handle_disconnect(self: &Arc<Self>, generation: u64, reason: &str) {
        let writer = {
            let mut link = self.link.lock().await;
            if link.generation != generation || link.writer.is_none() {
                debug!("reader for generation {generation} exited after teardown");
                return;
            }
            // This handle belongs to the task running this code.
            link.reader = None;
            self.state.send_replace(ConnectionState::Disconnected);
            let failed = self.pending.fail_all(|| ClientError::ConnectionClosed);
            warn!(
                "connection to {} lost ({reason}); {failed} pending request(s) failed",
                self.config.url
            );
            self.schedule_reconnect(generation);
            link.writer.take()
        };

        if let Some(writer) = writer {
            writer.close().await;
        }
    }

    fn schedule_reconnect(self: &Arc<Self>, generation: u64) {
        let weak = Arc::downgrade(self);
        self.reconnect.schedule(move || async move {
            if let Some(shared) = weak.upgrade() {
                shared.connect(Some(generation)).await;
            }
        });
    }

    /// Writes `frame`, refusing if the handshake has not completed.
    async fn write_when_identified(&self, frame: &ClientMessage) -> Result<(), ClientError> {
        let mut link = self.link.lock().await;
        if !self.state.borrow().is_identified() {
            return Err(ClientError::NotConnected);
        }
        let writer = link.writer.as_mut().ok_or(ClientError::NotConnected)?;
        writer.send(frame).await.map_err(ClientError::from)
    }

    async fn on_message(
        &self,
        msg: ServerMessage,
        generation: u64,
        events: &mpsc::UnboundedSender<Event>,
    ) {
        match msg {
            ServerMessage::Hello(hello) => {
                let identify = handshake::identify_for(
                    &hello,
                    self.config.password(),
                    self.config.event_subscriptions,
                );
                let authenticated = identify.authentication.is_some();

                let mut link = self.link.lock().await;
                if link.generation != generation {
                    return;
                }
                let Some(writer) = link.writer.as_mut() else {
                    return;
                };
                match writer.send(&ClientMessage::Identify(identify)).await {
                    Ok(()) => debug!("sent Identify (authenticated: {authenticated})"),
                    Err(e) => warn!("failed to send Identify: {e}"),
                }
            }
            ServerMessage::Identified(identified) => {
                let link = self.link.lock().await;
                if link.generation != generation || link.writer.is_none() {
                    return;
                }
                self.state.send_replace(ConnectionState::Identified);
                self.reconnect.reset_backoff();
                match identified.negotiated_rpc_version {
                    Some(rpc) => info!("identified with {} (rpc version {rpc})", self.config.url),
                    None => info!("identified with {}", self.config.url),
                }
            }
            ServerMessage::Event(event) => {
                if events.send(event).is_err() {
                    debug!("event task has stopped; dropping event");
                }
            }
            ServerMessage::RequestResponse(response)
            | ServerMessage::RequestBatchResponse(response) => {
                self.pending.resolve(response);
            }
            ServerMessage::Unsupported { op } => {
                debug!("ignoring frame with opcode {op}");
            }
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Some(reader) = self.link.get_mut().reader.take() {
            reader.abort();
        }
    }
}

// ── Background tasks ──────────────────────────────────────────────────────────

/// Reads frames until the connection ends, then hands the teardown to
/// [`Shared::handle_disconnect`].
///
/// Holds only a weak reference between frames so dropping every
/// [`ObsClient`] handle shuts the connection down.
async fn read_loop(
    weak: Weak<Shared>,
    mut reader: FrameReader,
    events: mpsc::UnboundedSender<Event>,
    generation: u64,
) {
    let reason = loop {
        let next = reader.next_message().await;
        let Some(shared) = weak.upgrade() else {
            return;
        };
        match next {
            None => break "stream ended".to_string(),
            Some(Ok(msg)) => {
                debug!("received {}", msg.kind());
                shared.on_message(msg, generation, &events).await;
            }
            Some(Err(e)) => break e.to_string(),
        }
    };

    if let Some(shared) = weak.upgrade() {
        shared.handle_disconnect(generation, &reason).await;
    }
}

/// Spawns the per-connection task that runs event handlers in order.
///
/// The task ends once the returned sender (owned by the reader) is dropped
/// and the queue has drained.
fn spawn_event_task(weak: Weak<Shared>) -> mpsc::UnboundedSender<Event> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let Some(shared) = weak.upgrade() else {
                break;
            };
            shared.handlers.dispatch(event);
        }
    });
    tx
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// A loopback address nothing listens on, so the dial is refused at once.
    fn unreachable_config() -> ConnectionConfig {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        drop(listener);
        ConnectionConfig {
            reconnect_delay: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(2),
            ..ConnectionConfig::new(format!("ws://127.0.0.1:{port}"))
        }
    }

    #[test]
    fn test_new_client_is_disconnected() {
        let client = ObsClient::new(ConnectionConfig::default());

        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(!client.is_connected());
        assert!(!client.reconnect_pending());
        assert_eq!(client.pending_requests(), 0);
    }

    #[test]
    fn test_close_without_connect_is_a_no_op() {
        // Arrange
        let client = ObsClient::new(ConnectionConfig::default());

        // Act
        tokio_test::block_on(client.close());
        tokio_test::block_on(client.close());

        // Assert
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_request_before_connect_fails_fast() {
        let client = ObsClient::new(ConnectionConfig::default());

        let result = client.send_request("GetVersion", None).await;

        assert!(matches!(result, Err(ClientError::NotConnected)));
        assert_eq!(client.pending_requests(), 0);
    }

    #[tokio::test]
    async fn test_typed_wrappers_fail_fast_when_disconnected() {
        let client = ObsClient::new(ConnectionConfig::default());

        assert!(matches!(
            client.start_recording().await,
            Err(ClientError::NotConnected)
        ));
        assert!(matches!(
            client.list_scenes().await,
            Err(ClientError::NotConnected)
        ));
        assert!(matches!(
            client.set_current_scene("Main").await,
            Err(ClientError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_failed_dial_schedules_reconnect_until_close() {
        // Arrange
        let client = ObsClient::new(unreachable_config());

        // Act
        client.connect().await;

        // Assert
        assert!(!client.is_connected());
        assert!(client.reconnect_pending());

        client.close().await;
        assert!(!client.reconnect_pending());
    }

    #[tokio::test]
    async fn test_wait_until_identified_times_out() {
        let client = ObsClient::new(ConnectionConfig::default());

        let result = client
            .wait_until_identified(Duration::from_millis(20))
            .await;

        assert!(matches!(result, Err(ClientError::HandshakeTimeout(_))));
    }

    #[tokio::test]
    async fn test_wait_until_identified_returns_once_state_is_identified() {
        // Arrange
        let client = ObsClient::new(ConnectionConfig::default());
        let waiter = client.clone();
        let wait = tokio::spawn(async move {
            waiter.wait_until_identified(Duration::from_secs(2)).await
        });

        // Act
        client.shared.state.send_replace(ConnectionState::Identified);

        // Assert
        assert!(matches!(wait.await, Ok(Ok(()))));
        assert!(client
            .wait_until_identified(Duration::from_millis(1))
            .await
            .is_ok());
    }

    #[test]
    fn test_event_handlers_can_be_replaced_and_removed() {
        let client = ObsClient::new(ConnectionConfig::default());

        client.on_event("ExitStarted", |_| {});
        client.on_event("ExitStarted", |_| {});

        assert!(client.remove_event_handler("ExitStarted"));
        assert!(!client.remove_event_handler("ExitStarted"));
    }

    #[test]
    fn test_clones_share_state() {
        let client = ObsClient::new(ConnectionConfig::default());
        let clone = client.clone();

        client.on_event("ExitStarted", |_| {});

        assert!(clone.remove_event_handler("ExitStarted"));
    }

    #[test]
    fn test_debug_output_omits_password() {
        let client = ObsClient::new(ConnectionConfig::default().with_password("hunter2"));
        assert!(!format!("{client:?}").contains("hunter2"));
    }
}
