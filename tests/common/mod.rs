//! Shared helpers for integration tests: a scripted transport and a presenter
//! that records every call.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use telemetry_dash::controller::{ControlState, DashboardController, Presenter};
use telemetry_dash::transport::{Connection, Frame, Transport, TransportError};
use telemetry_dash::window::ChartSnapshot;

/// What the next `connect` call does.
#[derive(Debug, Clone)]
pub enum ConnectScript {
    /// Handshake fails.
    Refuse,
    /// Handshake succeeds; the connection plays back these steps.
    Accept(Vec<Step>),
}

/// One step of an accepted connection.
#[derive(Debug, Clone)]
pub enum Step {
    /// Deliver a frame.
    Frame(Frame),
    /// Fail with a receive error.
    Fail,
    /// Never deliver anything again.
    Hang,
}

/// Shorthand for a text frame step.
pub fn text(frame: &str) -> Step {
    Step::Frame(Frame::Text(frame.to_string()))
}

/// Text frame for a reading.
pub fn reading_frame(temperature: f64, humidity: f64) -> Step {
    text(&format!(
        r#"{{"temperature_celsius": {}, "humidity_percent": {}}}"#,
        temperature, humidity
    ))
}

/// Transport that plays back connection scripts in order. Once the scripts
/// run out every handshake is refused.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    scripts: Arc<Mutex<VecDeque<ConnectScript>>>,
    connects: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
}

impl ScriptedTransport {
    pub fn new(scripts: Vec<ConnectScript>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(scripts.into())),
            ..Default::default()
        }
    }

    /// Transport whose every handshake fails.
    pub fn unreachable() -> Self {
        Self::default()
    }

    /// Number of handshakes attempted.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Whether any accepted connection was closed by the supervisor.
    pub fn was_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    type Conn = ScriptedConnection;

    async fn connect(&self, _endpoint: &str) -> Result<Self::Conn, TransportError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let next = self.scripts.lock().unwrap().pop_front();
        match next {
            Some(ConnectScript::Accept(steps)) => Ok(ScriptedConnection {
                steps: steps.into(),
                closed: Arc::clone(&self.closed),
            }),
            Some(ConnectScript::Refuse) | None => {
                Err(TransportError::Handshake("connection refused".to_string()))
            }
        }
    }
}

pub struct ScriptedConnection {
    steps: VecDeque<Step>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Connection for ScriptedConnection {
    async fn next_frame(&mut self) -> Result<Frame, TransportError> {
        match self.steps.pop_front() {
            Some(Step::Frame(frame)) => Ok(frame),
            Some(Step::Fail) => Err(TransportError::Receive("connection reset".to_string())),
            Some(Step::Hang) | None => std::future::pending().await,
        }
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// One presenter call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Status(String),
    Temperature(String),
    Humidity(String),
    Chart(ChartSnapshot),
    Controls(ControlState),
}

/// Presenter that records every call in order.
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    pub calls: Vec<Call>,
}

impl RecordingPresenter {
    pub fn statuses(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Status(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn last_status(&self) -> Option<String> {
        self.statuses().pop()
    }

    pub fn last_chart(&self) -> Option<&ChartSnapshot> {
        self.calls.iter().rev().find_map(|call| match call {
            Call::Chart(snapshot) => Some(snapshot),
            _ => None,
        })
    }

    pub fn last_controls(&self) -> Option<ControlState> {
        self.calls.iter().rev().find_map(|call| match call {
            Call::Controls(controls) => Some(*controls),
            _ => None,
        })
    }

    pub fn last_temperature(&self) -> Option<&str> {
        self.calls.iter().rev().find_map(|call| match call {
            Call::Temperature(text) => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn last_humidity(&self) -> Option<&str> {
        self.calls.iter().rev().find_map(|call| match call {
            Call::Humidity(text) => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn redraws(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, Call::Chart(_)))
            .count()
    }
}

impl Presenter for RecordingPresenter {
    fn set_status_text(&mut self, text: &str) {
        self.calls.push(Call::Status(text.to_string()));
    }

    fn set_temperature_label(&mut self, text: &str) {
        self.calls.push(Call::Temperature(text.to_string()));
    }

    fn set_humidity_label(&mut self, text: &str) {
        self.calls.push(Call::Humidity(text.to_string()));
    }

    fn redraw_chart(&mut self, snapshot: &ChartSnapshot) {
        self.calls.push(Call::Chart(snapshot.clone()));
    }

    fn set_controls(&mut self, controls: ControlState) {
        self.calls.push(Call::Controls(controls));
    }
}

/// Pump `controller` until `done` holds or `timeout` elapses.
pub fn pump_until<T, F>(
    controller: &mut DashboardController<T>,
    presenter: &mut RecordingPresenter,
    timeout: Duration,
    mut done: F,
) -> bool
where
    T: Transport + Clone,
    F: FnMut(&DashboardController<T>, &RecordingPresenter) -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        controller.pump(presenter);
        if done(controller, presenter) {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}
