// src/stats.rs
//! Smoothed frame-rate measurement.
//!
//! Every producer update counts as one frame. The tracker keeps the
//! instantaneous rate from the last inter-frame interval plus a sliding
//! average over a fixed window, which is what the external status glue
//! usually wants to display.

use std::time::Instant;

/// Number of frames in the sliding average window.
pub const FPS_WINDOW: usize = 25;

/// Frame-rate tracker fed by producer updates.
#[derive(Debug)]
pub struct FrameStats {
    samples: Vec<f64>,
    last: Instant,
    current: f64,
}

impl FrameStats {
    pub fn new() -> Self {
        Self {
            samples: Vec::with_capacity(FPS_WINDOW),
            last: Instant::now(),
            current: 0.0,
        }
    }

    /// Records one frame, returning the instantaneous rate.
    pub fn record(&mut self) -> f64 {
        let now = Instant::now();
        let interval = now.duration_since(self.last).as_secs_f64();
        self.last = now;
        self.record_interval(interval)
    }

    /// Records a frame from an explicit interval in seconds.
    ///
    /// Zero-length intervals are ignored (two updates within timer
    /// resolution); the previous instantaneous value is returned.
    pub fn record_interval(&mut self, interval_secs: f64) -> f64 {
        if interval_secs <= 0.0 {
            return self.current;
        }
        self.current = 1.0 / interval_secs;
        if self.samples.len() == FPS_WINDOW {
            self.samples.remove(0);
        }
        self.samples.push(self.current);
        self.current
    }

    /// Instantaneous rate from the most recent interval.
    pub fn current(&self) -> f64 {
        self.current
    }

    /// Sliding average over the recorded window.
    pub fn average(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new()
    }
}
