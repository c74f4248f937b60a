//! Cross-power between two receivers.
//!
//! The spectral path multiplies channelized spectra; the quantized path emulates a coarse
//! digitizer followed by a time-domain correlator.

use crate::math::fft::FftHelper;
use crate::prelude::{ChainError, ChainResult};
use crate::telemetry::log::LogManager;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use num_complex::{Complex32, Complex64};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Above this length the time-domain correlation switches to an FFT.
const DIRECT_CORRELATION_LIMIT: usize = 1024;

/// Largest lag sum the f64 FFT path reproduces exactly after rounding.
const EXACT_FFT_SUM_LIMIT: u128 = 1 << 52;

/// Digitizer resolution used by the field correlation check.
pub const DEFAULT_FIELD_BIT_DEPTH: u32 = 4;

/// Per-cell cross-power `A · conj(B)` of two equally shaped spectrograms.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossPower {
    product: Array2<Complex32>,
}

impl CrossPower {
    pub fn compute(
        first: ArrayView2<'_, Complex32>,
        second: ArrayView2<'_, Complex32>,
    ) -> ChainResult<Self> {
        if first.dim() != second.dim() {
            return Err(ChainError::InvalidParameter(format!(
                "spectrogram shapes differ: {:?} vs {:?}",
                first.dim(),
                second.dim()
            )));
        }
        let product = ndarray::Zip::from(&first)
            .and(&second)
            .map_collect(|a, b| a * b.conj());
        Ok(Self { product })
    }

    pub fn product(&self) -> &Array2<Complex32> {
        &self.product
    }

    pub fn dim(&self) -> (usize, usize) {
        self.product.dim()
    }

    /// Phase of every cell in (-π, π].
    pub fn phase(&self) -> Array2<f32> {
        self.product.mapv(|c| {
            let angle = c.arg();
            if angle <= -PI {
                PI
            } else {
                angle
            }
        })
    }

    pub fn magnitude(&self) -> Array2<f32> {
        self.product.mapv(|c| c.norm())
    }

    /// Phase averaged over the time axis, per channel.
    pub fn mean_phase(&self) -> ChainResult<Array1<f32>> {
        self.phase()
            .mean_axis(Axis(0))
            .ok_or_else(|| ChainError::InvalidParameter("no spectra to average".into()))
    }

    /// Magnitude averaged over the time axis, per channel.
    pub fn mean_magnitude(&self) -> ChainResult<Array1<f32>> {
        self.magnitude()
            .mean_axis(Axis(0))
            .ok_or_else(|| ChainError::InvalidParameter("no spectra to average".into()))
    }

    /// Complex cross-power averaged over time: one visibility per channel.
    pub fn integrated(&self) -> ChainResult<Array1<Complex32>> {
        self.product
            .mean_axis(Axis(0))
            .ok_or_else(|| ChainError::InvalidParameter("no spectra to average".into()))
    }
}

/// Phase and magnitude of `A · conj(B)` per (time, channel) cell.
pub fn cross_power(
    first: ArrayView2<'_, Complex32>,
    second: ArrayView2<'_, Complex32>,
) -> ChainResult<(Array2<f32>, Array2<f32>)> {
    let power = CrossPower::compute(first, second)?;
    Ok((power.phase(), power.magnitude()))
}

/// Integer samples plus the count that hit the converter's rails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quantized {
    pub samples: Vec<i64>,
    pub clamped: usize,
}

/// Rounds to the nearest integer (ties to even) and saturates to the two's-complement range
/// of `bit_depth` bits.
pub fn quantize(signal: &[f64], bit_depth: u32) -> ChainResult<Quantized> {
    if !(1..=32).contains(&bit_depth) {
        return Err(ChainError::InvalidParameter(format!(
            "bit depth must be within 1..=32, got {}",
            bit_depth
        )));
    }
    let max_pos = (1i64 << (bit_depth - 1)) - 1;
    let max_neg = -(1i64 << (bit_depth - 1));

    if let Some(index) = signal.iter().position(|value| !value.is_finite()) {
        return Err(ChainError::InvalidParameter(format!(
            "cannot digitize non-finite sample {} at index {}",
            signal[index], index
        )));
    }

    let mut clamped = 0;
    let samples = signal
        .iter()
        .map(|&value| {
            let rounded = value.round_ties_even();
            if rounded > max_pos as f64 {
                clamped += 1;
                max_pos
            } else if rounded < max_neg as f64 {
                clamped += 1;
                max_neg
            } else {
                rounded as i64
            }
        })
        .collect();

    if clamped > 0 {
        LogManager::new("correlator").precision_loss(&format!(
            "{} of {} samples clamped at {} bits",
            clamped,
            signal.len(),
            bit_depth
        ));
    }
    Ok(Quantized { samples, clamped })
}

pub fn digitize(signal: &[f64], bit_depth: u32) -> ChainResult<Vec<i64>> {
    quantize(signal, bit_depth).map(|q| q.samples)
}

/// Same-length cross-correlation with zero lag at index `len / 2`, divided by `len`.
///
/// Output index `i` holds `Σ_l first[l] · second[l - τ]` for lag `τ = i - len/2`. Sums are
/// exact: long inputs go through an FFT only while every lag sum fits the f64 mantissa.
pub fn cross_correlate(first: &[i64], second: &[i64]) -> ChainResult<Vec<f64>> {
    if first.len() != second.len() {
        return Err(ChainError::InvalidParameter(format!(
            "sequence lengths differ: {} vs {}",
            first.len(),
            second.len()
        )));
    }
    if first.is_empty() {
        return Ok(Vec::new());
    }

    let sums = if first.len() > DIRECT_CORRELATION_LIMIT && fft_sums_are_exact(first, second) {
        correlate_fft(first, second)
    } else {
        correlate_direct(first, second)
    };
    let n = first.len() as f64;
    Ok(sums.into_iter().map(|s| s as f64 / n).collect())
}

/// Bound on any lag sum: `len · max|first| · max|second|`.
fn fft_sums_are_exact(first: &[i64], second: &[i64]) -> bool {
    let peak = |values: &[i64]| values.iter().map(|v| v.unsigned_abs()).max().unwrap_or(0) as u128;
    let bound = (first.len() as u128)
        .saturating_mul(peak(first))
        .saturating_mul(peak(second));
    bound < EXACT_FFT_SUM_LIMIT
}

fn correlate_direct(first: &[i64], second: &[i64]) -> Vec<i128> {
    let n = first.len() as i64;
    let centre = n / 2;
    (0..n)
        .map(|i| {
            let lag = i - centre;
            let start = lag.max(0);
            let end = n.min(n + lag);
            (start..end)
                .map(|l| first[l as usize] as i128 * second[(l - lag) as usize] as i128)
                .sum()
        })
        .collect()
}

fn correlate_fft(first: &[i64], second: &[i64]) -> Vec<i128> {
    let n = first.len();
    let size = (2 * n - 1).next_power_of_two();
    let fft = FftHelper::<f64>::new(size);

    let pad = |values: &[i64]| -> Vec<Complex64> {
        let mut buffer: Vec<Complex64> = values
            .iter()
            .map(|&v| Complex64::new(v as f64, 0.0))
            .collect();
        buffer.resize(size, Complex64::new(0.0, 0.0));
        buffer
    };
    let mut spectrum = pad(first);
    let mut reference = pad(second);
    fft.forward_in_place(&mut spectrum);
    fft.forward_in_place(&mut reference);
    for (a, b) in spectrum.iter_mut().zip(&reference) {
        *a *= b.conj();
    }
    fft.inverse_in_place(&mut spectrum);

    // circular lag τ sits at index τ for τ >= 0 and size + τ for τ < 0
    let centre = (n / 2) as i64;
    (0..n as i64)
        .map(|i| {
            let lag = i - centre;
            let index = if lag >= 0 { lag as usize } else { (size as i64 + lag) as usize };
            (spectrum[index].re / size as f64).round() as i128
        })
        .collect()
}

/// Digitizes two real voltage sequences and cross-correlates the results.
pub fn simple_real_cross_power(
    first: &[f64],
    second: &[f64],
    bit_depth: u32,
) -> ChainResult<Vec<f64>> {
    if first.len() != second.len() {
        return Err(ChainError::InvalidParameter(format!(
            "sequence lengths differ: {} vs {}",
            first.len(),
            second.len()
        )));
    }
    let q1 = digitize(first, bit_depth)?;
    let q2 = digitize(second, bit_depth)?;
    cross_correlate(&q1, &q2)
}

/// One correlation value at a physical delay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LagSample {
    pub delay: f64,
    pub value: f64,
}

/// `width` correlation values around zero lag, tagged with delay = lag · `sample_interval`.
pub fn lag_window(xc: &[f64], width: usize, sample_interval: f64) -> ChainResult<Vec<LagSample>> {
    let centre = xc.len() / 2;
    let before = width / 2;
    let after = width - before;
    if before > centre || centre + after > xc.len() {
        return Err(ChainError::InvalidParameter(format!(
            "lag window of {} does not fit a correlation of {}",
            width,
            xc.len()
        )));
    }

    Ok(xc[centre - before..centre + after]
        .iter()
        .enumerate()
        .map(|(offset, &value)| LagSample {
            delay: (offset as f64 - before as f64) * sample_interval,
            value,
        })
        .collect())
}

/// Lag with the largest absolute correlation.
pub fn peak_lag(window: &[LagSample]) -> Option<LagSample> {
    window
        .iter()
        .copied()
        .max_by(|a, b| a.value.abs().total_cmp(&b.value.abs()))
}
