use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Counters accumulated across a workflow run.
pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub spectra: usize,
    pub pixels: usize,
    pub dropped_samples: usize,
    pub clamped_samples: usize,
    pub errors: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut MetricsSnapshot)) {
        if let Ok(mut metrics) = self.inner.lock() {
            apply(&mut metrics);
        }
    }

    pub fn record_spectra(&self, count: usize) {
        self.update(|m| m.spectra += count);
    }

    pub fn record_pixels(&self, count: usize) {
        self.update(|m| m.pixels += count);
    }

    pub fn record_dropped(&self, count: usize) {
        self.update(|m| m.dropped_samples += count);
    }

    pub fn record_clamped(&self, count: usize) {
        self.update(|m| m.clamped_samples += count);
    }

    pub fn record_error(&self) {
        self.update(|m| m.errors += 1);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        if let Ok(metrics) = self.inner.lock() {
            *metrics
        } else {
            MetricsSnapshot::default()
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
