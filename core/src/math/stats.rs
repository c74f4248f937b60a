use crate::prelude::{ChainError, ChainResult};
use num_complex::Complex32;

pub struct StatsHelper;

impl StatsHelper {
    pub fn rms(samples: &[f64]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = samples.iter().map(|&v| v * v).sum();
        (sum_sq / samples.len() as f64).sqrt()
    }

    /// Mean |x|² of a complex sample buffer.
    pub fn mean_power(samples: &[Complex32]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum: f64 = samples.iter().map(|c| c.norm_sqr() as f64).sum();
        sum / samples.len() as f64
    }

    /// Pearson correlation coefficient of two equal-length sequences.
    pub fn correlation_coefficient(a: &[f64], b: &[f64]) -> ChainResult<f64> {
        if a.len() != b.len() {
            return Err(ChainError::InvalidParameter(format!(
                "sequence lengths differ: {} vs {}",
                a.len(),
                b.len()
            )));
        }
        if a.len() < 2 {
            return Err(ChainError::InvalidParameter(
                "correlation coefficient needs at least two samples".into(),
            ));
        }

        let n = a.len() as f64;
        let mean_a = a.iter().sum::<f64>() / n;
        let mean_b = b.iter().sum::<f64>() / n;
        let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
        for (&x, &y) in a.iter().zip(b) {
            let dx = x - mean_a;
            let dy = y - mean_b;
            cov += dx * dy;
            var_a += dx * dx;
            var_b += dy * dy;
        }

        if var_a == 0.0 || var_b == 0.0 {
            return Err(ChainError::InvalidParameter(
                "correlation coefficient undefined for a constant sequence".into(),
            ));
        }
        Ok(cov / (var_a * var_b).sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_zero_sequence_yields_zero() {
        assert_eq!(StatsHelper::rms(&[]), 0.0);
        assert_eq!(StatsHelper::rms(&[0.0, 0.0]), 0.0);
    }

    #[test]
    fn rms_handles_single_value() {
        assert_eq!(StatsHelper::rms(&[4.0]), 4.0);
    }

    #[test]
    fn mean_power_of_unit_phasors_is_one() {
        let samples = [Complex32::new(1.0, 0.0), Complex32::new(0.0, -1.0)];
        assert!((StatsHelper::mean_power(&samples) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn correlation_coefficient_detects_anticorrelation() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [8.0, 6.0, 4.0, 2.0];
        let r = StatsHelper::correlation_coefficient(&a, &b).unwrap();
        assert!((r + 1.0).abs() < 1e-12);
    }

    #[test]
    fn correlation_coefficient_rejects_constant_input() {
        let err = StatsHelper::correlation_coefficient(&[1.0, 1.0], &[0.0, 1.0]).unwrap_err();
        assert!(matches!(err, ChainError::InvalidParameter(_)));
    }
}
