use crate::workflow::config::WorkflowConfig;
use crate::workflow::runner::WorkflowResult;
use interfcore::imaging::ImageExtent;
use interfcore::processing::LagSample;
use interfcore::telemetry::MetricsSnapshot;
use serde::{Deserialize, Serialize};

/// Summary of the point-spread function handed to plotting tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PsfSummary {
    pub num_pix: usize,
    pub frequency_hz: f64,
    pub extent: ImageExtent,
    pub peak: Option<(f64, f64, f64)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixels: Option<Vec<Vec<f64>>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportModel {
    pub config: WorkflowConfig,
    pub spectrogram_shape: (usize, usize),
    pub channel_frequencies_hz: Vec<f64>,
    pub mean_phase: Vec<f32>,
    pub mean_magnitude: Vec<f32>,
    pub lag_window: Vec<LagSample>,
    pub lag_peak: Option<LagSample>,
    pub correlation_coefficient: Option<f64>,
    pub psf: PsfSummary,
    pub metrics: MetricsSnapshot,
}

impl ReportModel {
    pub fn from_result(config: &WorkflowConfig, result: &WorkflowResult) -> Self {
        let pixels = config.imaging.include_pixels.then(|| {
            result
                .psf
                .pixels()
                .outer_iter()
                .map(|row| row.to_vec())
                .collect()
        });

        Self {
            config: config.clone(),
            spectrogram_shape: result.spectrogram_shape,
            channel_frequencies_hz: result.channel_frequencies.clone(),
            mean_phase: result.mean_phase.clone(),
            mean_magnitude: result.mean_magnitude.clone(),
            lag_window: result.lag_window.clone(),
            lag_peak: result.lag_peak,
            correlation_coefficient: result.correlation_coefficient,
            psf: PsfSummary {
                num_pix: result.psf.num_pix(),
                frequency_hz: result.imaging_frequency,
                extent: result.psf.extent(),
                peak: result.psf.peak(),
                pixels,
            },
            metrics: result.metrics,
        }
    }
}
