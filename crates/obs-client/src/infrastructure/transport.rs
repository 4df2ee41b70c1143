//! WebSocket transport to the server.
//!
//! [`dial`] opens one WebSocket connection and splits it into a
//! [`FrameWriter`] and a [`FrameReader`].  The writer is shared behind the
//! client's connection lock; the reader is owned by the connection's reader
//! task.  Both speak whole frames: the writer encodes [`ClientMessage`]s and
//! the reader decodes [`ServerMessage`]s, so nothing above this module sees
//! raw WebSocket messages.

use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use obs_core::{decode_message, encode_message, ClientMessage, ProtocolError, ServerMessage};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long [`FrameWriter::close`] waits for the Close frame to flush.
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: WsError,
    },

    #[error("timed out connecting to {url} after {timeout:?}")]
    ConnectTimeout { url: String, timeout: Duration },

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    #[error("could not encode frame: {0}")]
    Encode(ProtocolError),

    #[error("could not decode frame: {0}")]
    Decode(ProtocolError),

    #[error("server closed the connection: {0}")]
    Closed(String),
}

/// Opens a WebSocket connection to `url`, giving up after `connect_timeout`.
///
/// # Errors
///
/// Returns [`TransportError::Connect`] if the TCP connect or the HTTP
/// upgrade fails, or [`TransportError::ConnectTimeout`] if neither finishes
/// in time.
pub async fn dial(
    url: &str,
    connect_timeout: Duration,
) -> Result<(FrameWriter, FrameReader), TransportError> {
    let (stream, _response) = match timeout(connect_timeout, connect_async(url)).await {
        Ok(Ok(pair)) => pair,
        Ok(Err(source)) => {
            return Err(TransportError::Connect {
                url: url.to_string(),
                source,
            })
        }
        Err(_) => {
            return Err(TransportError::ConnectTimeout {
                url: url.to_string(),
                timeout: connect_timeout,
            })
        }
    };

    let (sink, stream) = stream.split();
    Ok((FrameWriter { sink }, FrameReader { stream }))
}

// ── Writer ────────────────────────────────────────────────────────────────────

/// Write half of a connection.
pub struct FrameWriter {
    sink: SplitSink<WsStream, WsMessage>,
}

impl FrameWriter {
    /// Encodes `msg` and sends it as one text frame.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Encode`] if the message cannot be encoded
    /// and [`TransportError::WebSocket`] if the socket write fails.
    pub async fn send(&mut self, msg: &ClientMessage) -> Result<(), TransportError> {
        let text = encode_message(msg).map_err(TransportError::Encode)?;
        trace!("-> {text}");
        self.sink.send(WsMessage::Text(text)).await?;
        Ok(())
    }

    /// Sends a Close frame and shuts the write half down.
    ///
    /// Best effort: errors are logged, and a peer that stops reading cannot
    /// stall the caller for longer than [`CLOSE_FLUSH_TIMEOUT`].
    pub async fn close(mut self) {
        match timeout(CLOSE_FLUSH_TIMEOUT, self.sink.close()).await {
            Ok(Ok(())) => debug!("sent close frame"),
            Ok(Err(e)) => debug!("close frame not delivered: {e}"),
            Err(_) => debug!("close frame flush timed out"),
        }
    }
}

// ── Reader ────────────────────────────────────────────────────────────────────

/// Read half of a connection.
pub struct FrameReader {
    stream: SplitStream<WsStream>,
}

impl FrameReader {
    /// Waits for the next protocol frame.
    ///
    /// Pings, pongs and binary frames are skipped; tungstenite answers pings
    /// on its own.  Returns `None` once the stream has ended.
    ///
    /// # Errors
    ///
    /// - [`TransportError::Decode`] for a text frame that is not a valid
    ///   protocol frame.
    /// - [`TransportError::Closed`] when the server sends a Close frame.
    /// - [`TransportError::WebSocket`] for socket-level failures.
    pub async fn next_message(&mut self) -> Option<Result<ServerMessage, TransportError>> {
        loop {
            let msg = match self.stream.next().await? {
                Ok(msg) => msg,
                Err(e) => return Some(Err(TransportError::WebSocket(e))),
            };

            match msg {
                WsMessage::Text(text) => {
                    trace!("<- {text}");
                    return Some(decode_message(&text).map_err(TransportError::Decode));
                }
                WsMessage::Close(frame) => {
                    let reason = match frame {
                        Some(f) => format!("code {} {}", u16::from(f.code), f.reason),
                        None => "no close frame payload".to_string(),
                    };
                    return Some(Err(TransportError::Closed(reason)));
                }
                WsMessage::Binary(data) => {
                    warn!("ignoring {}-byte binary frame", data.len());
                }
                WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => {}
            }
        }
    }
}
