//! Mock telemetry feed.
//!
//! Serves a WebSocket endpoint (any path) that pushes one JSON reading per
//! interval to every connected client, in the same frame format the real
//! sensor gateway uses. Values follow a bounded random walk so the chart has
//! something to show.

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::DashResult;
use crate::transport::TransportError;

/// Simulator settings.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Time between frames
    pub interval: Duration,
    /// `sensor_id` reported in frames
    pub sensor_id: String,
    /// `location` reported in frames
    pub location: String,
    /// `process_stage` reported in frames
    pub process_stage: String,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            sensor_id: "SIM-SHT20-001".to_string(),
            location: "Warehouse 1".to_string(),
            process_stage: "Fermentation".to_string(),
        }
    }
}

/// Wire format of one frame.
#[derive(Debug, Serialize)]
struct SensorFrame<'a> {
    timestamp: String,
    sensor_id: &'a str,
    location: &'a str,
    process_stage: &'a str,
    temperature_celsius: f64,
    humidity_percent: f64,
}

/// Bounded random walk over temperature and humidity.
#[derive(Debug)]
pub struct SensorModel {
    rng: StdRng,
    temperature: f64,
    humidity: f64,
}

impl SensorModel {
    /// Start from typical warehouse conditions.
    pub fn new(rng: StdRng) -> Self {
        Self {
            rng,
            temperature: 27.0,
            humidity: 75.0,
        }
    }

    /// Advance one step and return `(temperature, humidity)` at the
    /// sensor's 0.1 resolution.
    pub fn step(&mut self) -> (f64, f64) {
        self.temperature = (self.temperature + self.rng.gen_range(-0.5..=0.5)).clamp(15.0, 40.0);
        self.humidity = (self.humidity + self.rng.gen_range(-1.5..=1.5)).clamp(30.0, 95.0);
        (round_tenth(self.temperature), round_tenth(self.humidity))
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Render one frame as JSON text.
pub fn render_frame(config: &SimulatorConfig, temperature: f64, humidity: f64) -> String {
    let frame = SensorFrame {
        timestamp: chrono::Utc::now().to_rfc3339(),
        sensor_id: &config.sensor_id,
        location: &config.location,
        process_stage: &config.process_stage,
        temperature_celsius: temperature,
        humidity_percent: humidity,
    };
    serde_json::to_string(&frame).unwrap_or_default()
}

/// Bind `addr` and serve until `cancel` fires.
pub async fn run(addr: SocketAddr, config: SimulatorConfig, cancel: CancellationToken) -> DashResult<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "simulator listening");
    serve(listener, config, cancel).await
}

/// Serve on an already bound listener until `cancel` fires.
pub async fn serve(
    listener: TcpListener,
    config: SimulatorConfig,
    cancel: CancellationToken,
) -> DashResult<()> {
    loop {
        let (stream, peer) = tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => accepted?,
        };
        info!(%peer, "client connected");
        let config = config.clone();
        let cancel = cancel.child_token();
        tokio::spawn(async move {
            if let Err(e) = stream_to_client(stream, config, cancel).await {
                warn!(%peer, error = %e, "client stream ended with error");
            }
            info!(%peer, "client disconnected");
        });
    }
    info!("simulator stopped");
    Ok(())
}

async fn stream_to_client(
    stream: TcpStream,
    config: SimulatorConfig,
    cancel: CancellationToken,
) -> Result<(), TransportError> {
    let ws = tokio_tungstenite::accept_async(stream)
        .await
        .map_err(|e| TransportError::Handshake(e.to_string()))?;
    let (mut sink, mut incoming) = ws.split();
    let mut model = SensorModel::new(StdRng::from_entropy());
    let mut ticker = tokio::time::interval(config.interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = sink.send(Message::Close(None)).await;
                return Ok(());
            }
            message = incoming.next() => match message {
                Some(Ok(Message::Close(_))) | None => return Ok(()),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(TransportError::Receive(e.to_string())),
            },
            _ = ticker.tick() => {
                let (temperature, humidity) = model.step();
                let frame = render_frame(&config, temperature, humidity);
                debug!(%frame, "sending frame");
                sink.send(Message::Text(frame))
                    .await
                    .map_err(|_| TransportError::Closed)?;
            }
        }
    }
}
