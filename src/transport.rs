//! Transport collaborator for the connection supervisor.
//!
//! The supervisor only needs three operations from a transport: open a
//! connection, receive the next frame, and close. [`Transport`] and
//! [`Connection`] capture exactly that so the state machine can be driven by
//! the WebSocket implementation ([`WsTransport`]) in production and by
//! scripted transports in tests.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

/// One inbound message unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text payload
    Text(String),
    /// Binary payload (expected to hold UTF-8 JSON)
    Binary(Vec<u8>),
}

/// Connection-level faults. These drive the supervisor into `Retrying`.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Endpoint could not be parsed.
    #[error("invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint {
        /// Configured endpoint
        endpoint: String,
        /// Parser message
        reason: String,
    },

    /// Connection refused or handshake rejected.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// Handshake did not finish in time.
    #[error("handshake timed out after {0:?}")]
    Timeout(Duration),

    /// Reading from an established connection failed.
    #[error("receive failed: {0}")]
    Receive(String),

    /// Peer closed the connection.
    #[error("connection closed by peer")]
    Closed,
}

/// Opens connections to a telemetry endpoint.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Connection type produced by a successful handshake.
    type Conn: Connection;

    /// Perform the handshake with `endpoint`.
    async fn connect(&self, endpoint: &str) -> Result<Self::Conn, TransportError>;
}

/// An established streaming connection.
#[async_trait]
pub trait Connection: Send {
    /// Wait for the next data frame.
    ///
    /// Control traffic (ping/pong) is handled internally. A closed stream is
    /// reported as [`TransportError::Closed`].
    async fn next_frame(&mut self) -> Result<Frame, TransportError>;

    /// Close the connection. Errors are not reported; the connection is
    /// discarded either way.
    async fn close(&mut self);
}

/// WebSocket transport built on `tokio-tungstenite`.
#[derive(Debug, Clone)]
pub struct WsTransport {
    connect_timeout: Duration,
}

impl WsTransport {
    /// Create a transport whose handshakes are bounded by `connect_timeout`.
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for WsTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

#[async_trait]
impl Transport for WsTransport {
    type Conn = WsConnection;

    async fn connect(&self, endpoint: &str) -> Result<Self::Conn, TransportError> {
        let url = url::Url::parse(endpoint).map_err(|e| TransportError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        if url.scheme() != "ws" {
            return Err(TransportError::InvalidEndpoint {
                endpoint: endpoint.to_string(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        let handshake = tokio_tungstenite::connect_async(url.as_str());
        let (stream, response) = tokio::time::timeout(self.connect_timeout, handshake)
            .await
            .map_err(|_| TransportError::Timeout(self.connect_timeout))?
            .map_err(|e| TransportError::Handshake(e.to_string()))?;

        debug!(status = %response.status(), "WebSocket handshake complete");
        Ok(WsConnection { stream })
    }
}

/// An open WebSocket connection.
pub struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Connection for WsConnection {
    async fn next_frame(&mut self) -> Result<Frame, TransportError> {
        loop {
            let message = match self.stream.next().await {
                Some(Ok(message)) => message,
                Some(Err(e)) => return Err(TransportError::Receive(e.to_string())),
                None => return Err(TransportError::Closed),
            };

            match message {
                Message::Text(text) => return Ok(Frame::Text(text)),
                Message::Binary(data) => return Ok(Frame::Binary(data)),
                Message::Close(frame) => {
                    debug!(?frame, "peer sent close frame");
                    return Err(TransportError::Closed);
                }
                // Pongs are queued by tungstenite and flushed on the next read
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!(error = %e, "error while closing WebSocket");
        }
    }
}
