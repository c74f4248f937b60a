use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Hardware-referred amplitude normalization applied to every filter bank by default.
pub const DEFAULT_CALIBRATION_FACTOR: f64 = 1.0 / 50.0;

/// Speed of light in vacuum, m/s.
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Shared configuration for the channelizer stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub num_channels: usize,
    pub num_taps: usize,
    #[serde(default = "default_calibration_factor")]
    pub calibration_factor: f64,
}

fn default_calibration_factor() -> f64 {
    DEFAULT_CALIBRATION_FACTOR
}

impl ChainConfig {
    pub fn new(num_channels: usize, num_taps: usize) -> Self {
        Self {
            num_channels,
            num_taps,
            calibration_factor: DEFAULT_CALIBRATION_FACTOR,
        }
    }

    pub fn with_calibration(mut self, calibration_factor: f64) -> Self {
        self.calibration_factor = calibration_factor;
        self
    }
}

/// Common error type for every component of the chain.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ChainError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("operation cancelled")]
    Cancelled,
}

pub type ChainResult<T> = Result<T, ChainError>;

/// Caller-owned flag checked between outer-loop iterations of the parallel stages.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Returns `Err(Cancelled)` once the token has been tripped.
    pub fn check(&self) -> ChainResult<()> {
        if self.is_cancelled() {
            Err(ChainError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Trait describing stateful signal-processing stages driven by a workflow runner.
pub trait ProcessingStage {
    type Input;
    type Output;

    fn initialize(&mut self, config: &ChainConfig) -> ChainResult<()>;
    fn execute(&mut self, input: Self::Input) -> ChainResult<Self::Output>;
    fn cleanup(&mut self);
}
