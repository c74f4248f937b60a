use crate::prelude::{CancelToken, ChainError, ChainResult};
use crate::processing::channelizer::PolyphaseChannelizer;
use crate::processing::filter_bank::FilterBank;
use crate::telemetry::log::LogManager;
use ndarray::{s, Array2, ArrayView2};
use num_complex::Complex32;
use rayon::prelude::*;
use std::f64::consts::PI;
use std::sync::Arc;

/// Time × channel grid of complex spectra.
pub type Spectrogram = Array2<Complex32>;

/// Complex baseband capture from one receiver at a fixed sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleStream {
    receiver_id: String,
    sample_rate: f64,
    samples: Vec<Complex32>,
}

impl SampleStream {
    pub fn new(
        receiver_id: impl Into<String>,
        sample_rate: f64,
        samples: Vec<Complex32>,
    ) -> ChainResult<Self> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(ChainError::InvalidParameter(format!(
                "sample rate must be positive, got {}",
                sample_rate
            )));
        }
        Ok(Self {
            receiver_id: receiver_id.into(),
            sample_rate,
            samples,
        })
    }

    pub fn receiver_id(&self) -> &str {
        &self.receiver_id
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn samples(&self) -> &[Complex32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Capture length in seconds.
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate
    }

    /// New stream without the first `count` samples.
    pub fn skip(&self, count: usize) -> Self {
        let start = count.min(self.samples.len());
        self.derive(self.samples[start..].to_vec())
    }

    /// New stream holding at most the first `length` samples.
    pub fn truncated(&self, length: usize) -> Self {
        let end = length.min(self.samples.len());
        self.derive(self.samples[..end].to_vec())
    }

    /// Constant phase rotation `exp(-2πi·rate·delay)` applied to every sample.
    pub fn rotate_for_delay(&self, delay_seconds: f64) -> Self {
        let phase = -2.0 * PI * self.sample_rate * delay_seconds;
        let rotation = Complex32::from_polar(1.0, phase as f32);
        self.derive(self.samples.iter().map(|&x| x * rotation).collect())
    }

    /// Splits the stream into rows of `num_channels` samples, dropping any trailing remainder.
    ///
    /// Returns the block matrix and the number of samples dropped.
    pub fn reshape(&self, num_channels: usize) -> ChainResult<(Array2<Complex32>, usize)> {
        let blocks = reshape_blocks(&self.samples, num_channels)?;
        let dropped = self.samples.len() - blocks.len();
        if dropped > 0 {
            LogManager::new("stream").precision_loss(&format!(
                "{}: dropped {} trailing samples to fit {} channels",
                self.receiver_id, dropped, num_channels
            ));
        }
        Ok((blocks, dropped))
    }

    fn derive(&self, samples: Vec<Complex32>) -> Self {
        Self {
            receiver_id: self.receiver_id.clone(),
            sample_rate: self.sample_rate,
            samples,
        }
    }
}

/// Floor-truncates `samples` to a multiple of `num_channels` and reshapes to (blocks, channels).
pub fn reshape_blocks(samples: &[Complex32], num_channels: usize) -> ChainResult<Array2<Complex32>> {
    if num_channels == 0 {
        return Err(ChainError::InvalidParameter(
            "cannot reshape into zero channels".into(),
        ));
    }
    let num_blocks = samples.len() / num_channels;
    let usable = num_blocks * num_channels;
    Array2::from_shape_vec((num_blocks, num_channels), samples[..usable].to_vec())
        .map_err(|err| ChainError::InvalidParameter(err.to_string()))
}

/// Two streams trimmed to a common, channel-aligned length.
#[derive(Debug, Clone)]
pub struct AlignedPair {
    pub first: SampleStream,
    pub second: SampleStream,
    pub dropped_samples: usize,
}

/// Applies an integer sample offset between two captures and trims both to the shortest
/// common multiple of `num_channels`.
///
/// A positive `offset` skips leading samples of `second`; a negative one skips `first`.
pub fn align_pair(
    first: &SampleStream,
    second: &SampleStream,
    offset: i64,
    num_channels: usize,
) -> ChainResult<AlignedPair> {
    if num_channels == 0 {
        return Err(ChainError::InvalidParameter(
            "cannot align to zero channels".into(),
        ));
    }
    if first.sample_rate() != second.sample_rate() {
        return Err(ChainError::InvalidParameter(format!(
            "sample rates differ: {} vs {}",
            first.sample_rate(),
            second.sample_rate()
        )));
    }

    let skip = offset.unsigned_abs() as usize;
    let (first_shifted, second_shifted) = if offset >= 0 {
        (first.clone(), second.skip(skip))
    } else {
        (first.skip(skip), second.clone())
    };

    let len_first = (first_shifted.len() / num_channels) * num_channels;
    let len_second = (second_shifted.len() / num_channels) * num_channels;
    let shortest = len_first.min(len_second);

    let dropped_samples = (first_shifted.len() - shortest) + (second_shifted.len() - shortest);
    Ok(AlignedPair {
        first: first_shifted.truncated(shortest),
        second: second_shifted.truncated(shortest),
        dropped_samples,
    })
}

/// Sky frequency of each channel: a linear grid from `center - rate/2` to `center + rate/2`.
pub fn channel_frequencies(center_hz: f64, sample_rate_hz: f64, num_channels: usize) -> Vec<f64> {
    let start = center_hz - sample_rate_hz / 2.0;
    match num_channels {
        0 => Vec::new(),
        1 => vec![start],
        n => {
            let step = sample_rate_hz / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Overlap-save wrapper that turns a block matrix into a gap-free spectrogram.
#[derive(Clone)]
pub struct StreamingChannelizer {
    channelizer: PolyphaseChannelizer,
}

impl StreamingChannelizer {
    pub fn new(bank: Arc<FilterBank>) -> Self {
        Self {
            channelizer: PolyphaseChannelizer::new(bank),
        }
    }

    pub fn filter_bank(&self) -> &FilterBank {
        self.channelizer.filter_bank()
    }

    /// Number of spectra produced for `num_blocks` input rows.
    pub fn output_len(&self, num_blocks: usize) -> usize {
        let taps = self.filter_bank().num_taps();
        if num_blocks < taps {
            0
        } else {
            num_blocks - (taps - 1)
        }
    }

    pub fn channelize_block(&self, blocks: ArrayView2<'_, Complex32>) -> ChainResult<Spectrogram> {
        self.channelize_block_cancellable(blocks, &CancelToken::new())
    }

    /// Slides a taps-deep window over the block axis with stride 1.
    ///
    /// Spectrum `i` depends only on blocks `[i, i + taps)`. Fewer blocks than taps gives an
    /// empty spectrogram.
    pub fn channelize_block_cancellable(
        &self,
        blocks: ArrayView2<'_, Complex32>,
        cancel: &CancelToken,
    ) -> ChainResult<Spectrogram> {
        let (num_taps, num_channels) = self.filter_bank().shape();
        if blocks.ncols() != num_channels {
            return Err(ChainError::InvalidParameter(format!(
                "blocks have {} channels, filter bank expects {}",
                blocks.ncols(),
                num_channels
            )));
        }

        let num_spectra = self.output_len(blocks.nrows());
        let spectra = (0..num_spectra)
            .into_par_iter()
            .map(|position| {
                cancel.check()?;
                self.channelizer
                    .channelize_one(blocks.slice(s![position..position + num_taps, ..]))
            })
            .collect::<ChainResult<Vec<_>>>()?;

        let mut output = Spectrogram::zeros((num_spectra, num_channels));
        for (mut row, spectrum) in output.outer_iter_mut().zip(spectra.iter()) {
            row.assign(spectrum);
        }
        Ok(output)
    }
}
