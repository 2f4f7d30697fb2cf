//! Connection supervisor: the connect / consume / back off / retry state
//! machine for one session.
//!
//! The supervisor runs as an async task on the session worker. It has exactly
//! three suspension points (handshake, next frame, backoff sleep) and each is
//! raced against a [`CancellationToken`] in a biased `select!`, so a stop
//! request interrupts whichever one is pending. Everything the controller
//! needs to know is sent over an unbounded channel as [`SupervisorEvent`]s;
//! the supervisor never touches presentation state.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{DashConfig, RetryConfig, RetryStrategy};
use crate::decoder::{decode, decode_bytes, Reading};
use crate::transport::{Connection, Frame, Transport, TransportError};

/// Lifecycle state of a session's connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No session has been started.
    #[default]
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Handshake done, consuming frames.
    Connected,
    /// Waiting out the backoff delay before the next attempt.
    Retrying,
    /// Session ended on request; terminal.
    Stopped,
}

impl ConnectionState {
    /// Human-readable status text.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting...",
            Self::Connected => "Connected",
            Self::Retrying => "Retrying...",
            Self::Stopped => "Stopped",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Events sent from the supervisor to the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum SupervisorEvent {
    /// The connection state changed.
    State(ConnectionState),
    /// A frame decoded successfully.
    Reading(Reading),
}

/// Delay schedule between failed attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffPolicy {
    /// Same delay before every retry, no cap on attempts.
    Fixed(Duration),
    /// `initial * 2^(attempt-1)`, capped at `max`.
    Exponential {
        /// Delay before the first retry
        initial: Duration,
        /// Ceiling
        max: Duration,
    },
}

impl BackoffPolicy {
    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match *self {
            Self::Fixed(delay) => delay,
            Self::Exponential { initial, max } => {
                let exponent = attempt.saturating_sub(1).min(31);
                initial.saturating_mul(1u32 << exponent).min(max)
            }
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::Fixed(Duration::from_secs(5))
    }
}

impl From<&RetryConfig> for BackoffPolicy {
    fn from(config: &RetryConfig) -> Self {
        match config.strategy {
            RetryStrategy::Fixed => Self::Fixed(config.delay),
            RetryStrategy::Exponential => Self::Exponential {
                initial: config.delay,
                max: config.max_delay,
            },
        }
    }
}

/// Per-session settings extracted from [`DashConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct SupervisorSettings {
    /// Telemetry endpoint
    pub endpoint: String,
    /// Retry schedule
    pub backoff: BackoffPolicy,
    /// Upper bound on closing the transport during stop
    pub close_timeout: Duration,
}

impl SupervisorSettings {
    /// Settings for `endpoint` with default backoff.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            backoff: BackoffPolicy::default(),
            close_timeout: Duration::from_secs(1),
        }
    }

    /// Replace the backoff policy.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }
}

impl From<&DashConfig> for SupervisorSettings {
    fn from(config: &DashConfig) -> Self {
        Self {
            endpoint: config.connection.endpoint.clone(),
            backoff: BackoffPolicy::from(&config.retry),
            close_timeout: config.connection.close_timeout,
        }
    }
}

/// Counters maintained by a running supervisor.
#[derive(Debug, Default)]
pub struct SessionStats {
    frames_received: AtomicU64,
    readings_decoded: AtomicU64,
    decode_failures: AtomicU64,
    connection_attempts: AtomicU64,
    retries: AtomicU64,
}

/// Point-in-time copy of [`SessionStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Data frames received
    pub frames_received: u64,
    /// Frames that produced a reading
    pub readings_decoded: u64,
    /// Frames rejected by the decoder
    pub decode_failures: u64,
    /// Handshakes started
    pub connection_attempts: u64,
    /// Backoff waits entered
    pub retries: u64,
}

impl SessionStats {
    /// Read all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            readings_decoded: self.readings_decoded.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            connection_attempts: self.connection_attempts.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
        }
    }
}

/// How a connected stream stopped being consumed.
enum StreamEnd {
    Cancelled,
    Lost(TransportError),
}

/// State machine for one session.
pub struct Supervisor<T: Transport> {
    settings: SupervisorSettings,
    transport: T,
    events: mpsc::UnboundedSender<SupervisorEvent>,
    cancel: CancellationToken,
    stats: Arc<SessionStats>,
    state: ConnectionState,
}

impl<T: Transport> Supervisor<T> {
    /// Create a supervisor. Nothing happens until [`run`](Self::run).
    pub fn new(
        settings: SupervisorSettings,
        transport: T,
        events: mpsc::UnboundedSender<SupervisorEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            settings,
            transport,
            events,
            cancel,
            stats: Arc::new(SessionStats::default()),
            state: ConnectionState::Disconnected,
        }
    }

    /// Shared handle to this supervisor's counters.
    pub fn stats(&self) -> Arc<SessionStats> {
        Arc::clone(&self.stats)
    }

    /// Run until the cancellation token fires. The last event sent is
    /// always `State(Stopped)`.
    pub async fn run(mut self) {
        info!(endpoint = %self.settings.endpoint, "supervisor starting");
        let mut attempt: u32 = 0;

        while !self.cancel.is_cancelled() {
            self.transition(ConnectionState::Connecting);
            self.stats.connection_attempts.fetch_add(1, Ordering::Relaxed);

            let connected = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                result = self.transport.connect(&self.settings.endpoint) => result,
            };

            match connected {
                Ok(mut conn) => {
                    attempt = 0;
                    self.transition(ConnectionState::Connected);
                    match self.consume(&mut conn).await {
                        StreamEnd::Cancelled => {
                            let closing = conn.close();
                            if tokio::time::timeout(self.settings.close_timeout, closing)
                                .await
                                .is_err()
                            {
                                debug!("transport close timed out");
                            }
                            break;
                        }
                        StreamEnd::Lost(e) => {
                            warn!(endpoint = %self.settings.endpoint, error = %e, "connection lost");
                        }
                    }
                }
                Err(e) => {
                    warn!(endpoint = %self.settings.endpoint, error = %e, "connection attempt failed");
                }
            }

            attempt = attempt.saturating_add(1);
            let delay = self.settings.backoff.delay_for(attempt);
            self.stats.retries.fetch_add(1, Ordering::Relaxed);
            self.transition(ConnectionState::Retrying);
            info!(attempt, delay_ms = delay.as_millis() as u64, "waiting before reconnect");

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.transition(ConnectionState::Stopped);
        info!("supervisor stopped");
    }

    /// Consume frames until the connection fails or a stop is requested.
    async fn consume(&mut self, conn: &mut T::Conn) -> StreamEnd {
        loop {
            let received = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return StreamEnd::Cancelled,
                received = conn.next_frame() => received,
            };
            let frame = match received {
                Ok(frame) => frame,
                Err(e) => return StreamEnd::Lost(e),
            };
            // A stop that raced with this frame wins.
            if self.cancel.is_cancelled() {
                return StreamEnd::Cancelled;
            }

            self.stats.frames_received.fetch_add(1, Ordering::Relaxed);
            let decoded = match &frame {
                Frame::Text(text) => decode(text),
                Frame::Binary(data) => decode_bytes(data),
            };
            match decoded {
                Ok(reading) => {
                    self.stats.readings_decoded.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        temperature = reading.temperature,
                        humidity = reading.humidity,
                        sensor_id = reading.sensor_id.as_deref().unwrap_or("-"),
                        "reading received"
                    );
                    self.emit(SupervisorEvent::Reading(reading));
                }
                Err(e) => {
                    self.stats.decode_failures.fetch_add(1, Ordering::Relaxed);
                    warn!(error = %e, "discarding undecodable frame");
                }
            }
        }
    }

    fn transition(&mut self, next: ConnectionState) {
        debug!(from = %self.state, to = %next, "state transition");
        self.state = next;
        info!(state = %next, "connection status");
        self.emit(SupervisorEvent::State(next));
    }

    fn emit(&self, event: SupervisorEvent) {
        if self.events.send(event).is_err() && !self.cancel.is_cancelled() {
            // Nobody is listening any more; wind the session down.
            warn!("event receiver dropped, stopping supervisor");
            self.cancel.cancel();
        }
    }
}
