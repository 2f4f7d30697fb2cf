//! Real-time telemetry dashboard.
//!
//! Keeps a persistent WebSocket connection to a sensor feed, decodes each
//! frame into a temperature / humidity [`Reading`](decoder::Reading), and feeds
//! two fixed-capacity rolling windows that back a scrolling chart.
//!
//! Architecture:
//! - [`supervisor`]: connect / consume / back off / retry state machine,
//!   cancellable at every suspension point
//! - [`session`]: runs one supervisor on a dedicated worker thread; stop
//!   cancels and joins
//! - [`controller`]: presentation-thread bridge between session events and a
//!   [`Presenter`](controller::Presenter), and between UI intent and sessions
//! - [`window`] / [`decoder`]: the data path, touched only by the controller
//!
//! # Example
//!
//! ```no_run
//! use telemetry_dash::{config::DashConfig, console::ConsolePresenter};
//! use telemetry_dash::controller::DashboardController;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DashConfig::load()?;
//! let mut controller = DashboardController::from_config(&config);
//! let mut view = ConsolePresenter::default();
//!
//! controller.on_start(&mut view)?;
//! std::thread::sleep(std::time::Duration::from_secs(10));
//! controller.pump(&mut view);
//! controller.on_stop(&mut view);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod console;
pub mod controller;
pub mod decoder;
pub mod error;
pub mod logging;
pub mod session;
pub mod simulator;
pub mod supervisor;
pub mod transport;
pub mod window;

#[cfg(feature = "gui_egui")]
pub mod gui;

pub use controller::{ControlState, DashboardController, Presenter};
pub use decoder::{decode, DecodeError, Reading};
pub use error::{DashError, DashResult};
pub use supervisor::{ConnectionState, SupervisorEvent};
pub use window::{ChartSnapshot, ChartWindows, RollingWindow};
