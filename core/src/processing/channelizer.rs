use crate::math::fft::FftHelper;
use crate::math::stats::StatsHelper;
use crate::prelude::{CancelToken, ChainConfig, ChainError, ChainResult, ProcessingStage};
use crate::processing::filter_bank::FilterBank;
use crate::processing::stream::{SampleStream, Spectrogram, StreamingChannelizer};
use crate::telemetry::log::LogManager;
use ndarray::{Array1, ArrayView2};
use num_complex::Complex32;
use std::sync::Arc;

/// Tap-summed polyphase filter bank followed by a DFT.
#[derive(Clone)]
pub struct PolyphaseChannelizer {
    bank: Arc<FilterBank>,
    fft: FftHelper,
}

impl PolyphaseChannelizer {
    pub fn new(bank: Arc<FilterBank>) -> Self {
        let fft = FftHelper::new(bank.num_channels());
        Self { bank, fft }
    }

    pub fn filter_bank(&self) -> &FilterBank {
        &self.bank
    }

    /// Channelizes one (taps, channels) window into a single spectrum.
    ///
    /// The window is weighted by the bank, summed over taps and transformed. No further
    /// reordering is applied to the output.
    pub fn channelize_one(&self, window: ArrayView2<'_, Complex32>) -> ChainResult<Array1<Complex32>> {
        if window.dim() != self.bank.shape() {
            return Err(ChainError::InvalidParameter(format!(
                "window shape {:?} does not match filter bank {:?}",
                window.dim(),
                self.bank.shape()
            )));
        }

        let mut folded = Array1::<Complex32>::zeros(self.bank.num_channels());
        for (samples, coefficients) in window
            .outer_iter()
            .zip(self.bank.coefficients().outer_iter())
        {
            for ((acc, &x), &c) in folded.iter_mut().zip(samples.iter()).zip(coefficients.iter()) {
                *acc += x * c;
            }
        }

        match folded.as_slice_mut() {
            Some(buffer) => self.fft.forward_in_place(buffer),
            None => {
                return Err(ChainError::InvalidParameter(
                    "folded spectrum is not contiguous".into(),
                ))
            }
        }
        Ok(folded)
    }
}

/// One-shot form of [`PolyphaseChannelizer::channelize_one`].
pub fn channelize_one(
    window: ArrayView2<'_, Complex32>,
    bank: &FilterBank,
) -> ChainResult<Array1<Complex32>> {
    PolyphaseChannelizer::new(Arc::new(bank.clone())).channelize_one(window)
}

/// A receiver's spectrogram together with the samples lost to block alignment.
#[derive(Debug, Clone)]
pub struct ChannelizedStream {
    pub receiver_id: String,
    pub spectra: Spectrogram,
    pub dropped_samples: usize,
}

/// Stage that reshapes a capture and runs it through the streaming channelizer.
pub struct ChannelizerStage {
    streaming: Option<StreamingChannelizer>,
    cancel: CancelToken,
    logger: LogManager,
}

impl ChannelizerStage {
    pub fn new(cancel: CancelToken) -> Self {
        Self {
            streaming: None,
            cancel,
            logger: LogManager::new("channelizer"),
        }
    }

    /// Reuses an already designed bank instead of designing one in `initialize`.
    pub fn with_filter_bank(bank: Arc<FilterBank>, cancel: CancelToken) -> Self {
        Self {
            streaming: Some(StreamingChannelizer::new(bank)),
            cancel,
            logger: LogManager::new("channelizer"),
        }
    }
}

impl ProcessingStage for ChannelizerStage {
    type Input = SampleStream;
    type Output = ChannelizedStream;

    fn initialize(&mut self, config: &ChainConfig) -> ChainResult<()> {
        if let Some(streaming) = &self.streaming {
            let bank = streaming.filter_bank();
            if bank.shape() == (config.num_taps, config.num_channels) {
                return Ok(());
            }
        }
        let bank = Arc::new(FilterBank::from_config(config)?);
        self.streaming = Some(StreamingChannelizer::new(bank));
        Ok(())
    }

    fn execute(&mut self, input: SampleStream) -> ChainResult<ChannelizedStream> {
        let streaming = self
            .streaming
            .as_ref()
            .ok_or_else(|| ChainError::InvalidParameter("channelizer not initialized".into()))?;

        let (blocks, dropped_samples) = input.reshape(streaming.filter_bank().num_channels())?;
        let spectra = streaming.channelize_block_cancellable(blocks.view(), &self.cancel)?;

        self.logger.record(&format!(
            "{}: {} spectra x {} channels, input power {:.4e}",
            input.receiver_id(),
            spectra.nrows(),
            spectra.ncols(),
            StatsHelper::mean_power(input.samples())
        ));

        Ok(ChannelizedStream {
            receiver_id: input.receiver_id().to_string(),
            spectra,
            dropped_samples,
        })
    }

    fn cleanup(&mut self) {
        self.streaming = None;
    }
}
