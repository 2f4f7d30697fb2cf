//! Desktop dashboard (eframe / egui_plot).
//!
//! Architecture:
//! - UI thread: egui immediate-mode rendering, never blocks on the network
//! - Session worker: dedicated thread with its own tokio runtime
//! - Communication: unbounded event channel drained once per frame

pub mod app;

pub use app::{run, DashboardApp, DashboardView};
