//! Headless presenter for the `watch` command.

use crate::controller::{ControlState, Presenter};
use crate::window::ChartSnapshot;

/// Writes status changes and readings to stdout.
#[derive(Debug, Default)]
pub struct ConsolePresenter {
    status: String,
    temperature: String,
    humidity: String,
    points: usize,
    redraws: u64,
    readings: u64,
    reading_pending: bool,
}

impl ConsolePresenter {
    /// Number of chart redraws seen so far.
    pub fn redraws(&self) -> u64 {
        self.redraws
    }

    /// One-line summary for the end of a run.
    pub fn summary(&self) -> String {
        format!(
            "{} | last: {} / {} | {} readings over a {}-point window",
            self.status, self.temperature, self.humidity, self.readings, self.points
        )
    }
}

impl Presenter for ConsolePresenter {
    fn set_status_text(&mut self, text: &str) {
        self.reading_pending = false;
        if self.status != text {
            println!("{}", text);
            self.status = text.to_string();
        }
    }

    fn set_temperature_label(&mut self, text: &str) {
        self.temperature = text.to_string();
    }

    fn set_humidity_label(&mut self, text: &str) {
        self.humidity = text.to_string();
        // Humidity is the last label written per reading.
        if std::mem::take(&mut self.reading_pending) {
            self.readings += 1;
            println!("Temperature: {:>9} | Humidity: {:>7}", self.temperature, self.humidity);
        }
    }

    fn redraw_chart(&mut self, snapshot: &ChartSnapshot) {
        self.points = snapshot.x_axis.len();
        self.redraws += 1;
        self.reading_pending = true;
    }

    fn set_controls(&mut self, _controls: ControlState) {
        self.reading_pending = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{format_humidity, format_temperature};
    use crate::window::ChartWindows;

    #[test]
    fn test_counts_readings_not_initial_draw() {
        let mut windows = ChartWindows::new(4);
        let mut console = ConsolePresenter::default();

        // Initial presentation: labels, chart, controls.
        console.set_status_text("Status: Disconnected");
        console.set_temperature_label("- °C");
        console.set_humidity_label("- %");
        console.redraw_chart(&windows.snapshot());
        console.set_controls(ControlState::IDLE);

        for value in [21.0, 22.0] {
            windows.push_reading(&crate::decoder::Reading {
                temperature: value,
                humidity: value * 2.0,
                ..Default::default()
            });
            console.redraw_chart(&windows.snapshot());
            console.set_temperature_label(&format_temperature(value));
            console.set_humidity_label(&format_humidity(value * 2.0));
        }

        assert_eq!(console.redraws(), 3);
        assert_eq!(
            console.summary(),
            "Status: Disconnected | last: 22.0 °C / 44.0 % | 2 readings over a 4-point window"
        );
    }
}
