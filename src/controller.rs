//! Dashboard controller: bridges supervisor events to the presentation layer
//! and presentation intent (start / stop) to sessions.
//!
//! The controller lives on the presentation thread. It owns the chart windows
//! and the receiving end of the active session's event channel, and it is the
//! only code that mutates either, so neither needs a lock.

use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{info, warn};

use crate::config::DashConfig;
use crate::decoder::Reading;
use crate::error::DashResult;
use crate::session::Session;
use crate::supervisor::{ConnectionState, StatsSnapshot, SupervisorEvent, SupervisorSettings};
use crate::transport::{Transport, WsTransport};
use crate::window::{ChartSnapshot, ChartWindows};

/// Enabled state of the start / stop controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlState {
    /// Start control accepts clicks
    pub start_enabled: bool,
    /// Stop control accepts clicks
    pub stop_enabled: bool,
}

impl ControlState {
    /// No session: only start is available.
    pub const IDLE: Self = Self {
        start_enabled: true,
        stop_enabled: false,
    };

    /// Session running: only stop is available.
    pub const RUNNING: Self = Self {
        start_enabled: false,
        stop_enabled: true,
    };
}

/// Presentation surface driven by the controller.
///
/// Implementations only store or draw what they are given; all formatting
/// happens in the controller.
pub trait Presenter {
    /// Replace the status line.
    fn set_status_text(&mut self, text: &str);
    /// Replace the instantaneous temperature readout.
    fn set_temperature_label(&mut self, text: &str);
    /// Replace the instantaneous humidity readout.
    fn set_humidity_label(&mut self, text: &str);
    /// Redraw the chart from a snapshot of both windows.
    fn redraw_chart(&mut self, snapshot: &ChartSnapshot);
    /// Enable or disable the start / stop controls.
    fn set_controls(&mut self, controls: ControlState);
}

/// Status line text for a connection state.
pub fn status_text(state: ConnectionState) -> String {
    format!("Status: {}", state)
}

/// Temperature readout, one decimal place.
pub fn format_temperature(value: f64) -> String {
    format!("{:.1} °C", value)
}

/// Humidity readout, one decimal place.
pub fn format_humidity(value: f64) -> String {
    format!("{:.1} %", value)
}

struct ActiveSession {
    session: Session,
    events: mpsc::UnboundedReceiver<SupervisorEvent>,
}

/// Controller for one dashboard instance.
pub struct DashboardController<T: Transport + Clone = WsTransport> {
    settings: SupervisorSettings,
    transport: T,
    windows: ChartWindows,
    active: Option<ActiveSession>,
    state: ConnectionState,
    last_reading: Option<Reading>,
    last_stats: StatsSnapshot,
}

impl DashboardController<WsTransport> {
    /// Controller using the WebSocket transport described by `config`.
    pub fn from_config(config: &DashConfig) -> Self {
        Self::new(
            SupervisorSettings::from(config),
            config.window.capacity,
            WsTransport::new(config.connection.connect_timeout),
        )
    }
}

impl<T: Transport + Clone> DashboardController<T> {
    /// Create an idle controller with zero-filled windows of `capacity` points.
    pub fn new(settings: SupervisorSettings, capacity: usize, transport: T) -> Self {
        Self {
            settings,
            transport,
            windows: ChartWindows::new(capacity),
            active: None,
            state: ConnectionState::Disconnected,
            last_reading: None,
            last_stats: StatsSnapshot::default(),
        }
    }

    /// Push the full current view to a freshly created presenter.
    pub fn present(&self, presenter: &mut dyn Presenter) {
        presenter.set_status_text(&status_text(self.state));
        match &self.last_reading {
            Some(reading) => {
                presenter.set_temperature_label(&format_temperature(reading.temperature));
                presenter.set_humidity_label(&format_humidity(reading.humidity));
            }
            None => {
                presenter.set_temperature_label("- °C");
                presenter.set_humidity_label("- %");
            }
        }
        presenter.redraw_chart(&self.windows.snapshot());
        presenter.set_controls(if self.active.is_some() {
            ControlState::RUNNING
        } else {
            ControlState::IDLE
        });
    }

    /// Start intent. Starts a new session unless one is already active.
    ///
    /// Returns `Ok(false)` when a session was already running.
    pub fn on_start(&mut self, presenter: &mut dyn Presenter) -> DashResult<bool> {
        if self.active.is_some() {
            return Ok(false);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let session = Session::start(self.settings.clone(), self.transport.clone(), tx)?;
        info!(endpoint = %self.settings.endpoint, "streaming started");
        self.active = Some(ActiveSession {
            session,
            events: rx,
        });
        presenter.set_controls(ControlState::RUNNING);
        Ok(true)
    }

    /// Stop intent. Blocks until the session has fully terminated, then
    /// delivers whatever it sent before exiting.
    ///
    /// Returns `false` (and does nothing) when no session is active.
    pub fn on_stop(&mut self, presenter: &mut dyn Presenter) -> bool {
        let Some(mut active) = self.active.take() else {
            return false;
        };

        active.session.stop();
        self.last_stats = active.session.stats();
        while let Ok(event) = active.events.try_recv() {
            self.apply(event, presenter);
        }
        self.finish_stopped(presenter);
        info!(stats = ?self.last_stats, "streaming stopped");
        true
    }

    /// Deliver all pending supervisor events. Returns how many were handled.
    pub fn pump(&mut self, presenter: &mut dyn Presenter) -> usize {
        let Some(active) = self.active.as_mut() else {
            return 0;
        };

        let mut pending = Vec::new();
        let disconnected = loop {
            match active.events.try_recv() {
                Ok(event) => pending.push(event),
                Err(TryRecvError::Empty) => break false,
                Err(TryRecvError::Disconnected) => break true,
            }
        };

        let handled = pending.len();
        for event in pending {
            self.apply(event, presenter);
        }

        if disconnected {
            // The worker exited without being asked to; reap it.
            warn!("session ended unexpectedly");
            if let Some(mut active) = self.active.take() {
                active.session.stop();
                self.last_stats = active.session.stats();
            }
            self.finish_stopped(presenter);
        }
        handled
    }

    /// Teardown: synchronously stop any active session without a presenter.
    ///
    /// Also run on drop.
    pub fn shutdown(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.session.stop();
            self.last_stats = active.session.stats();
            self.state = ConnectionState::Stopped;
            info!("dashboard shut down");
        }
    }

    /// True while a session is active.
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Last state reported by a session.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Chart windows.
    pub fn windows(&self) -> &ChartWindows {
        &self.windows
    }

    /// Most recent reading.
    pub fn last_reading(&self) -> Option<&Reading> {
        self.last_reading.as_ref()
    }

    /// Counters of the active session, or of the last one.
    pub fn stats(&self) -> StatsSnapshot {
        match &self.active {
            Some(active) => active.session.stats(),
            None => self.last_stats,
        }
    }

    fn apply(&mut self, event: SupervisorEvent, presenter: &mut dyn Presenter) {
        match event {
            SupervisorEvent::State(state) => {
                self.state = state;
                presenter.set_status_text(&status_text(state));
            }
            SupervisorEvent::Reading(reading) => {
                self.windows.push_reading(&reading);
                presenter.redraw_chart(&self.windows.snapshot());
                presenter.set_temperature_label(&format_temperature(reading.temperature));
                presenter.set_humidity_label(&format_humidity(reading.humidity));
                self.last_reading = Some(reading);
            }
        }
    }

    fn finish_stopped(&mut self, presenter: &mut dyn Presenter) {
        if self.state != ConnectionState::Stopped {
            self.state = ConnectionState::Stopped;
            presenter.set_status_text(&status_text(self.state));
        }
        presenter.set_controls(ControlState::IDLE);
    }
}

impl<T: Transport + Clone> Drop for DashboardController<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_formatting() {
        assert_eq!(format_temperature(23.456), "23.5 °C");
        assert_eq!(format_temperature(0.0), "0.0 °C");
        assert_eq!(format_humidity(60.04), "60.0 %");
        assert_eq!(status_text(ConnectionState::Connected), "Status: Connected");
        assert_eq!(status_text(ConnectionState::Retrying), "Status: Retrying...");
    }

    #[test]
    fn test_control_states() {
        assert!(ControlState::IDLE.start_enabled);
        assert!(!ControlState::IDLE.stop_enabled);
        assert!(!ControlState::RUNNING.start_enabled);
        assert!(ControlState::RUNNING.stop_enabled);
    }
}
