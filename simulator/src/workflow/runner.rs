use crate::generator::profile::ReceiverPair;
use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use interfcore::imaging::{DirectImager, SkyImage, Visibilities};
use interfcore::math::StatsHelper;
use interfcore::prelude::{CancelToken, ProcessingStage};
use interfcore::processing::{
    align_pair, channel_frequencies, cross_correlate, lag_window, peak_lag, quantize,
    ChannelizerStage, CrossPower, FilterBank, LagSample, SampleStream, Spectrogram,
};
use interfcore::telemetry::{LogManager, MetricsRecorder, MetricsSnapshot};
use log::warn;
use std::sync::Arc;

pub struct WorkflowResult {
    pub spectrogram_shape: (usize, usize),
    pub channel_frequencies: Vec<f64>,
    pub mean_phase: Vec<f32>,
    pub mean_magnitude: Vec<f32>,
    pub lag_window: Vec<LagSample>,
    pub lag_peak: Option<LagSample>,
    pub correlation_coefficient: Option<f64>,
    pub imaging_frequency: f64,
    pub psf: SkyImage,
    pub metrics: MetricsSnapshot,
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
    cancel: CancelToken,
}

impl Runner {
    pub fn new(config: WorkflowConfig, cancel: CancelToken) -> Self {
        Self { config, cancel }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn execute(&self, pair: &ReceiverPair) -> anyhow::Result<WorkflowResult> {
        let metrics = MetricsRecorder::new();
        let result = self.run_chain(pair, &metrics);
        if result.is_err() {
            metrics.record_error();
            warn!("workflow failed, metrics {:?}", metrics.snapshot());
        }
        result
    }

    fn run_chain(
        &self,
        pair: &ReceiverPair,
        metrics: &MetricsRecorder,
    ) -> anyhow::Result<WorkflowResult> {
        let logger = LogManager::new("runner");
        let chain_config = self.config.to_chain_config();

        let aligned = align_pair(
            &pair.first,
            &pair.second,
            self.config.offset,
            chain_config.num_channels,
        )
        .context("aligning receiver streams")?;
        metrics.record_dropped(aligned.dropped_samples);

        let bank = Arc::new(FilterBank::from_config(&chain_config).context("designing filter bank")?);
        let first = self.channelize(&bank, aligned.first.clone(), metrics)?;
        let second = self.channelize(&bank, aligned.second.clone(), metrics)?;

        let cross = CrossPower::compute(first.view(), second.view())
            .context("computing spectral cross-power")?;
        let mean_phase = cross
            .mean_phase()
            .context("averaging cross-power phase")?
            .to_vec();
        let mean_magnitude = cross
            .mean_magnitude()
            .context("averaging cross-power magnitude")?
            .to_vec();

        let (lag_samples, correlation_coefficient) =
            self.quantized_correlation(&aligned.first, &aligned.second, metrics)?;
        let lag_peak = peak_lag(&lag_samples);

        let baselines = self.config.baselines();
        let grid = self.config.image_grid()?;
        let imaging_frequency = self.config.imaging_frequency();
        let imager = DirectImager::new(grid, imaging_frequency).context("configuring imager")?;
        let psf = imager
            .image_cancellable(&Visibilities::Uniform, &baselines, &self.cancel)
            .context("forming point-spread function")?;
        metrics.record_pixels(psf.num_pix() * psf.num_pix());

        logger.record(&format!(
            "chain complete: {} spectra, {} baselines, psf {}x{}",
            first.nrows(),
            baselines.len(),
            psf.num_pix(),
            psf.num_pix()
        ));

        Ok(WorkflowResult {
            spectrogram_shape: cross.dim(),
            channel_frequencies: channel_frequencies(
                self.config.center_frequency,
                self.config.sample_rate,
                chain_config.num_channels,
            ),
            mean_phase,
            mean_magnitude,
            lag_window: lag_samples,
            lag_peak,
            correlation_coefficient,
            imaging_frequency,
            psf,
            metrics: metrics.snapshot(),
        })
    }

    fn channelize(
        &self,
        bank: &Arc<FilterBank>,
        stream: SampleStream,
        metrics: &MetricsRecorder,
    ) -> anyhow::Result<Spectrogram> {
        let receiver = stream.receiver_id().to_string();
        let mut stage = ChannelizerStage::with_filter_bank(bank.clone(), self.cancel.clone());
        stage
            .initialize(&self.config.to_chain_config())
            .with_context(|| format!("initializing channelizer for {}", receiver))?;
        let output = stage
            .execute(stream)
            .with_context(|| format!("channelizing {}", receiver))?;
        stage.cleanup();

        metrics.record_dropped(output.dropped_samples);
        metrics.record_spectra(output.spectra.nrows());
        Ok(output.spectra)
    }

    /// Digitizes the in-phase voltages and correlates them in the time domain.
    fn quantized_correlation(
        &self,
        first: &SampleStream,
        second: &SampleStream,
        metrics: &MetricsRecorder,
    ) -> anyhow::Result<(Vec<LagSample>, Option<f64>)> {
        let scale = self.config.voltage_scale;
        let voltages = |stream: &SampleStream| -> Vec<f64> {
            stream
                .samples()
                .iter()
                .map(|c| c.re as f64 * scale)
                .collect()
        };
        let (v1, v2) = (voltages(first), voltages(second));

        let q1 = quantize(&v1, self.config.bit_depth).context("digitizing first receiver")?;
        let q2 = quantize(&v2, self.config.bit_depth).context("digitizing second receiver")?;
        metrics.record_clamped(q1.clamped + q2.clamped);

        let xc = cross_correlate(&q1.samples, &q2.samples).context("correlating voltages")?;
        let width = self.config.lag_window.min(xc.len());
        let window = lag_window(&xc, width, 1.0 / self.config.sample_rate)
            .context("extracting lag window")?;

        let coefficient = match StatsHelper::correlation_coefficient(&v1, &v2) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("correlation coefficient unavailable: {}", err);
                None
            }
        };
        Ok((window, coefficient))
    }
}
