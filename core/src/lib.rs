//! Signal chain for the field interferometer.
//!
//! Raw receiver samples are channelized by a polyphase filter bank, cross-correlated
//! between antenna pairs, and turned into sky images by direct Fourier summation over
//! the array's baselines.

pub mod imaging;
pub mod math;
pub mod prelude;
pub mod processing;
pub mod telemetry;

pub use prelude::{CancelToken, ChainConfig, ChainError, ChainResult, ProcessingStage};
