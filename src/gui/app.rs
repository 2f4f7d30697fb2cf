//! Dashboard window: start/stop controls, readouts and the rolling chart.

use std::time::Duration;

use eframe::{egui, App, Frame};
use egui::{Color32, RichText};
use egui_plot::{Legend, Line, Plot, PlotPoints};
use tracing::error;

use crate::config::DashConfig;
use crate::controller::{ControlState, DashboardController, Presenter};
use crate::window::{ChartSnapshot, ChartWindows};

const TEMPERATURE_COLOR: Color32 = Color32::from_rgb(0xd9, 0x53, 0x4f);
const HUMIDITY_COLOR: Color32 = Color32::from_rgb(0x42, 0x8b, 0xca);

/// Everything the window draws, written only through [`Presenter`].
pub struct DashboardView {
    /// Status line
    pub status: String,
    /// Temperature readout
    pub temperature: String,
    /// Humidity readout
    pub humidity: String,
    /// Latest chart data
    pub chart: ChartSnapshot,
    /// Button enablement
    pub controls: ControlState,
    /// Last start failure, shown under the status line
    pub error: Option<String>,
}

impl DashboardView {
    fn new(capacity: usize) -> Self {
        Self {
            status: String::new(),
            temperature: String::new(),
            humidity: String::new(),
            chart: ChartWindows::new(capacity).snapshot(),
            controls: ControlState::IDLE,
            error: None,
        }
    }
}

impl Presenter for DashboardView {
    fn set_status_text(&mut self, text: &str) {
        self.status = text.to_string();
    }

    fn set_temperature_label(&mut self, text: &str) {
        self.temperature = text.to_string();
    }

    fn set_humidity_label(&mut self, text: &str) {
        self.humidity = text.to_string();
    }

    fn redraw_chart(&mut self, snapshot: &ChartSnapshot) {
        self.chart = snapshot.clone();
    }

    fn set_controls(&mut self, controls: ControlState) {
        self.controls = controls;
    }
}

/// Main GUI application state.
pub struct DashboardApp {
    controller: DashboardController,
    view: DashboardView,
}

impl DashboardApp {
    /// Create the app with an idle controller.
    pub fn new(config: &DashConfig) -> Self {
        let controller = DashboardController::from_config(config);
        let mut view = DashboardView::new(config.window.capacity);
        controller.present(&mut view);
        Self { controller, view }
    }

    fn controls_ui(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let start = egui::Button::new(RichText::new("Start Stream").strong())
                .fill(Color32::from_rgb(0x28, 0xa7, 0x45));
            if ui.add_enabled(self.view.controls.start_enabled, start).clicked() {
                self.view.error = None;
                if let Err(e) = self.controller.on_start(&mut self.view) {
                    error!(error = %e, "failed to start streaming");
                    self.view.error = Some(e.to_string());
                }
            }

            let stop = egui::Button::new(RichText::new("Stop Stream").strong())
                .fill(Color32::from_rgb(0xdc, 0x35, 0x45));
            if ui.add_enabled(self.view.controls.stop_enabled, stop).clicked() {
                self.controller.on_stop(&mut self.view);
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(RichText::new(&self.view.status).strong());
            });
        });

        if let Some(message) = &self.view.error {
            ui.colored_label(Color32::RED, message);
        }
    }

    fn readouts_ui(&self, ui: &mut egui::Ui) {
        ui.columns(2, |columns| {
            columns[0].label(
                RichText::new(format!("Temperature: {}", self.view.temperature))
                    .size(24.0)
                    .color(TEMPERATURE_COLOR)
                    .strong(),
            );
            columns[1].label(
                RichText::new(format!("Humidity: {}", self.view.humidity))
                    .size(24.0)
                    .color(HUMIDITY_COLOR)
                    .strong(),
            );
        });
    }

    fn chart_ui(&self, ui: &mut egui::Ui) {
        let temperature = PlotPoints::from(self.view.chart.temperature_points());
        let humidity = PlotPoints::from(self.view.chart.humidity_points());
        Plot::new("telemetry_chart")
            .legend(Legend::default())
            .allow_drag(false)
            .allow_zoom(false)
            .show(ui, |plot_ui| {
                plot_ui.line(
                    Line::new(temperature)
                        .name("Temperature (°C)")
                        .color(TEMPERATURE_COLOR)
                        .width(2.0),
                );
                plot_ui.line(
                    Line::new(humidity)
                        .name("Humidity (%)")
                        .color(HUMIDITY_COLOR)
                        .width(2.0),
                );
            });
    }
}

impl App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.controller.pump(&mut self.view);

        // Window teardown waits for the session to unwind.
        if ctx.input(|i| i.viewport().close_requested()) {
            self.controller.shutdown();
        }

        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            ui.add_space(4.0);
            self.controls_ui(ui);
            ui.add_space(4.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.readouts_ui(ui);
            ui.separator();
            self.chart_ui(ui);
        });

        ctx.request_repaint_after(Duration::from_millis(100));
    }
}

/// Open the dashboard window and block until it is closed.
pub fn run(config: DashConfig) -> eframe::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([800.0, 650.0])
            .with_min_inner_size([480.0, 360.0])
            .with_title(config.application.name.as_str()),
        ..Default::default()
    };

    let title = config.application.name.clone();
    eframe::run_native(
        &title,
        options,
        Box::new(move |_cc| Ok(Box::new(DashboardApp::new(&config)))),
    )
}
