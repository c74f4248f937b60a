//! Kaiser-windowed sinc low-pass design.
//!
//! Frequencies are normalized to Nyquist (1.0 == half the sample rate).

use std::f64::consts::PI;

/// Below this argument I0 is summed as a power series, above it the asymptotic expansion is used.
const SERIES_LIMIT: f64 = 30.0;
const MAX_SERIES_TERMS: usize = 200;
const MAX_ASYMPTOTIC_TERMS: usize = 30;

fn bessel_i0_series(x: f64) -> f64 {
    let half = x / 2.0;
    let mut term = 1.0;
    let mut sum = 1.0;
    for k in 1..=MAX_SERIES_TERMS {
        let ratio = half / k as f64;
        term *= ratio * ratio;
        sum += term;
        if term < sum * 1e-17 {
            break;
        }
    }
    sum
}

/// `sqrt(2πx) · e^{-x} · I0(x)` for large `x`.
fn bessel_i0_asymptotic_factor(x: f64) -> f64 {
    let mut term = 1.0;
    let mut sum = 1.0;
    for k in 1..=MAX_ASYMPTOTIC_TERMS {
        let odd = (2 * k - 1) as f64;
        term *= odd * odd / (8.0 * x * k as f64);
        sum += term;
        if term < sum * 1e-17 {
            break;
        }
    }
    sum
}

/// Exponentially scaled Bessel function `e^{-|x|} · I0(x)`, finite for every finite `x`.
pub fn bessel_i0e(x: f64) -> f64 {
    let x = x.abs();
    if x.is_nan() {
        f64::NAN
    } else if x <= SERIES_LIMIT {
        bessel_i0_series(x) * (-x).exp()
    } else {
        bessel_i0_asymptotic_factor(x) / (2.0 * PI * x).sqrt()
    }
}

/// Modified Bessel function of the first kind, order 0. Overflows to infinity past x ≈ 713.
pub fn bessel_i0(x: f64) -> f64 {
    let x = x.abs();
    if x <= SERIES_LIMIT {
        bessel_i0_series(x)
    } else {
        bessel_i0e(x) * x.exp()
    }
}

/// Symmetric Kaiser window of `length` points.
pub fn kaiser_window(length: usize, beta: f64) -> Vec<f64> {
    if length == 0 {
        return vec![];
    }
    if length == 1 {
        return vec![1.0];
    }

    let half = (length - 1) as f64 / 2.0;
    let beta = beta.abs();
    let i0e_beta = bessel_i0e(beta);

    // I0(arg) / I0(beta) evaluated on the scaled form so large β cannot overflow
    (0..length)
        .map(|n| {
            let x = (n as f64 - half) / half;
            let arg = beta * (1.0 - x * x).max(0.0).sqrt();
            bessel_i0e(arg) / i0e_beta * (arg - beta).exp()
        })
        .collect()
}

/// Stopband attenuation (dB) a Kaiser design reaches for the given length and transition width.
pub fn kaiser_attenuation(num_taps: usize, width: f64) -> f64 {
    2.285 * (num_taps as f64 - 1.0) * PI * width + 7.95
}

/// Kaiser β parameter for a desired stopband attenuation in dB.
pub fn kaiser_beta(attenuation_db: f64) -> f64 {
    if attenuation_db > 50.0 {
        0.1102 * (attenuation_db - 8.7)
    } else if attenuation_db > 21.0 {
        0.5842 * (attenuation_db - 21.0).powf(0.4) + 0.07886 * (attenuation_db - 21.0)
    } else {
        0.0
    }
}

fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        1.0
    } else {
        let px = PI * x;
        px.sin() / px
    }
}

/// Linear-phase low-pass FIR with a Kaiser window sized from the transition `width`.
///
/// The result is scaled to unit gain at DC.
pub fn windowed_lowpass(num_taps: usize, cutoff: f64, width: f64) -> Vec<f64> {
    let beta = kaiser_beta(kaiser_attenuation(num_taps, width));
    let window = kaiser_window(num_taps, beta);
    let alpha = (num_taps as f64 - 1.0) / 2.0;

    let mut coefficients: Vec<f64> = window
        .iter()
        .enumerate()
        .map(|(n, w)| cutoff * sinc(cutoff * (n as f64 - alpha)) * w)
        .collect();

    let gain: f64 = coefficients.iter().sum();
    if gain != 0.0 {
        coefficients.iter_mut().for_each(|c| *c /= gain);
    }
    coefficients
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bessel_i0_matches_reference_values() {
        assert!((bessel_i0(0.0) - 1.0).abs() < 1e-15);
        assert!((bessel_i0(1.0) - 1.266_065_877_752_008_4).abs() < 1e-12);
        assert!((bessel_i0(5.0) - 27.239_871_823_604_44).abs() < 1e-9);
    }

    #[test]
    fn bessel_i0_terminates_for_extreme_arguments() {
        assert_eq!(bessel_i0(1.0e4), f64::INFINITY);
        assert!(bessel_i0(f64::NAN).is_nan());
        assert!(bessel_i0e(1.0e4).is_finite());
        assert!(bessel_i0e(f64::INFINITY) == 0.0);
    }

    #[test]
    fn scaled_bessel_branches_agree() {
        for x in [31.0, 40.0, 60.0] {
            let series = bessel_i0_series(x) * (-x).exp();
            let asymptotic = bessel_i0e(x);
            assert!((series - asymptotic).abs() / series < 1e-12, "x = {}", x);
        }
    }

    #[test]
    fn large_beta_window_stays_finite() {
        let window = kaiser_window(101, 800.0);
        assert!(window.iter().all(|w| w.is_finite() && *w >= 0.0));
        assert_eq!(window[50], 1.0);
        assert!(window[0] < 1e-300);
    }

    #[test]
    fn kaiser_window_is_symmetric_and_peaks_at_centre() {
        let window = kaiser_window(9, 6.0);
        for n in 0..9 {
            assert!((window[n] - window[8 - n]).abs() < 1e-12);
        }
        assert!((window[4] - 1.0).abs() < 1e-12);
        assert!(window[0] < window[2]);
    }

    #[test]
    fn zero_beta_window_is_rectangular() {
        assert!(kaiser_window(5, 0.0).iter().all(|&w| (w - 1.0).abs() < 1e-12));
    }

    #[test]
    fn lowpass_has_unit_dc_gain_and_linear_phase() {
        let taps = windowed_lowpass(64, 0.25, 0.125);
        let sum: f64 = taps.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        for n in 0..64 {
            assert!((taps[n] - taps[63 - n]).abs() < 1e-12);
        }
    }
}
