//! Fixed-capacity rolling windows feeding the time-series chart.
//!
//! A [`RollingWindow`] always holds exactly `capacity` values: it starts
//! zero-filled and every push evicts the oldest value. [`ChartWindows`] keeps
//! the temperature and humidity windows in lockstep and owns the immutable
//! x-axis `0..capacity`.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::decoder::Reading;

/// Default number of points shown on the chart.
pub const DEFAULT_WINDOW_CAPACITY: usize = 100;

/// FIFO buffer of exactly `capacity` values.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    values: VecDeque<f64>,
    capacity: usize,
}

impl RollingWindow {
    /// Create a zero-filled window. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: std::iter::repeat(0.0).take(capacity).collect(),
            capacity,
        }
    }

    /// Append `value`, evicting the oldest one.
    pub fn push(&mut self, value: f64) {
        self.values.pop_front();
        self.values.push_back(value);
    }

    /// Copy of the current values, oldest first.
    pub fn snapshot(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }

    /// Most recently pushed value (zero before the first push).
    pub fn latest(&self) -> f64 {
        self.values.back().copied().unwrap_or_default()
    }

    /// Number of values held; always equal to [`capacity`](Self::capacity).
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false: a window is never under-filled.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Immutable copy of both series plus the x-axis, handed to the presenter.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSnapshot {
    /// Fixed x-axis `0..capacity`, shared between snapshots.
    pub x_axis: Arc<[f64]>,
    /// Temperature series, oldest first.
    pub temperature: Vec<f64>,
    /// Humidity series, oldest first.
    pub humidity: Vec<f64>,
}

impl ChartSnapshot {
    /// `[x, y]` pairs for the temperature series.
    pub fn temperature_points(&self) -> Vec<[f64; 2]> {
        zip_points(&self.x_axis, &self.temperature)
    }

    /// `[x, y]` pairs for the humidity series.
    pub fn humidity_points(&self) -> Vec<[f64; 2]> {
        zip_points(&self.x_axis, &self.humidity)
    }
}

fn zip_points(x_axis: &[f64], series: &[f64]) -> Vec<[f64; 2]> {
    x_axis.iter().zip(series).map(|(x, y)| [*x, *y]).collect()
}

/// The pair of windows behind the dashboard chart.
#[derive(Debug, Clone)]
pub struct ChartWindows {
    x_axis: Arc<[f64]>,
    temperature: RollingWindow,
    humidity: RollingWindow,
}

impl ChartWindows {
    /// Create both windows with the same capacity.
    pub fn new(capacity: usize) -> Self {
        let temperature = RollingWindow::new(capacity);
        let humidity = RollingWindow::new(capacity);
        let x_axis = (0..temperature.capacity()).map(|i| i as f64).collect();
        Self {
            x_axis,
            temperature,
            humidity,
        }
    }

    /// Push one reading into both windows.
    pub fn push_reading(&mut self, reading: &Reading) {
        self.temperature.push(reading.temperature);
        self.humidity.push(reading.humidity);
    }

    /// Snapshot of both series and the x-axis.
    pub fn snapshot(&self) -> ChartSnapshot {
        ChartSnapshot {
            x_axis: Arc::clone(&self.x_axis),
            temperature: self.temperature.snapshot(),
            humidity: self.humidity.snapshot(),
        }
    }

    /// The fixed x-axis.
    pub fn x_axis(&self) -> &[f64] {
        &self.x_axis
    }

    /// Temperature window.
    pub fn temperature(&self) -> &RollingWindow {
        &self.temperature
    }

    /// Humidity window.
    pub fn humidity(&self) -> &RollingWindow {
        &self.humidity
    }

    /// Shared capacity of both windows.
    pub fn capacity(&self) -> usize {
        self.temperature.capacity()
    }
}

impl Default for ChartWindows {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::decode;

    #[test]
    fn test_new_window_is_zero_filled() {
        let window = RollingWindow::new(5);
        assert_eq!(window.len(), 5);
        assert_eq!(window.snapshot(), vec![0.0; 5]);
        assert_eq!(window.latest(), 0.0);
    }

    #[test]
    fn test_partial_fill_is_left_padded() {
        let mut window = RollingWindow::new(5);
        window.push(1.0);
        window.push(2.0);
        assert_eq!(window.snapshot(), vec![0.0, 0.0, 0.0, 1.0, 2.0]);
        assert_eq!(window.latest(), 2.0);
    }

    #[test]
    fn test_length_is_constant() {
        let mut window = RollingWindow::new(3);
        for i in 0..50 {
            window.push(i as f64);
            assert_eq!(window.len(), 3);
        }
        assert_eq!(window.snapshot(), vec![47.0, 48.0, 49.0]);
    }

    #[test]
    fn test_evicts_oldest_after_overflow() {
        let mut window = RollingWindow::new(100);
        for i in 1..=105 {
            window.push(i as f64);
        }
        let snapshot = window.snapshot();
        assert_eq!(snapshot.len(), 100);
        assert_eq!(snapshot.first(), Some(&6.0));
        assert_eq!(snapshot.last(), Some(&105.0));
        let expected: Vec<f64> = (6..=105).map(|i| i as f64).collect();
        assert_eq!(snapshot, expected);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut window = RollingWindow::new(0);
        assert_eq!(window.capacity(), 1);
        window.push(7.0);
        assert_eq!(window.snapshot(), vec![7.0]);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut window = RollingWindow::new(2);
        window.push(1.0);
        let before = window.snapshot();
        window.push(2.0);
        assert_eq!(before, vec![0.0, 1.0]);
    }

    #[test]
    fn test_chart_windows_lockstep() {
        let mut windows = ChartWindows::new(4);
        let reading = decode(r#"{"temperature_celsius": 23.5}"#).unwrap();
        windows.push_reading(&reading);

        let snapshot = windows.snapshot();
        assert_eq!(snapshot.temperature.len(), snapshot.humidity.len());
        assert_eq!(snapshot.temperature, vec![0.0, 0.0, 0.0, 23.5]);
        assert_eq!(snapshot.humidity, vec![0.0; 4]);
        assert_eq!(&*snapshot.x_axis, &[0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_x_axis_shared_and_fixed() {
        let mut windows = ChartWindows::new(3);
        let first = windows.snapshot();
        let reading = decode(r#"{"temperature_celsius": 1, "humidity_percent": 2}"#).unwrap();
        windows.push_reading(&reading);
        let second = windows.snapshot();
        assert!(Arc::ptr_eq(&first.x_axis, &second.x_axis));
        assert_eq!(
            second.humidity_points(),
            vec![[0.0, 0.0], [1.0, 0.0], [2.0, 2.0]]
        );
    }
}
