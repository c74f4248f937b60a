use crate::math::window::windowed_lowpass;
use crate::prelude::{ChainConfig, ChainError, ChainResult};
use crate::telemetry::log::LogManager;
use ndarray::{Array2, ArrayView2};

/// Polyphase prototype coefficients laid out as (taps, channels).
///
/// Built once per (channels, taps, calibration) and shared read-only by every channelizer
/// call that uses the same shape.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterBank {
    coefficients: Array2<f32>,
    calibration_factor: f64,
}

impl FilterBank {
    /// Designs the prototype low-pass and folds it into a (taps, channels) bank.
    ///
    /// The prototype has cutoff `1/channels` and transition width `0.5/channels` (Nyquist
    /// normalized). Flat coefficient `n` is multiplied by `(-1)^n`, which moves the DC channel
    /// to index `channels/2` of every spectrum, then by `sqrt(channels)` so output power does not
    /// depend on the channel count, then by `calibration_factor`.
    pub fn design(
        num_channels: usize,
        num_taps: usize,
        calibration_factor: f64,
    ) -> ChainResult<Self> {
        if num_channels < 1 {
            return Err(ChainError::InvalidParameter(
                "filter bank needs at least one channel".into(),
            ));
        }
        if num_taps < 1 {
            return Err(ChainError::InvalidParameter(
                "filter bank needs at least one tap".into(),
            ));
        }
        if !calibration_factor.is_finite() {
            return Err(ChainError::InvalidParameter(format!(
                "calibration factor must be finite, got {}",
                calibration_factor
            )));
        }

        let length = num_taps.checked_mul(num_channels).ok_or_else(|| {
            ChainError::InvalidParameter("taps x channels overflows".into())
        })?;
        let channels = num_channels as f64;
        let prototype = windowed_lowpass(length, 1.0 / channels, 0.5 / channels);
        if prototype.iter().any(|h| !h.is_finite()) {
            return Err(ChainError::InvalidParameter(format!(
                "prototype for {} taps x {} channels is not finite",
                num_taps, num_channels
            )));
        }

        let scale = channels.sqrt() * calibration_factor;
        let flat: Vec<f32> = prototype
            .iter()
            .enumerate()
            .map(|(n, &h)| {
                let sign = if n % 2 == 0 { 1.0 } else { -1.0 };
                (sign * h * scale) as f32
            })
            .collect();

        let coefficients = Array2::from_shape_vec((num_taps, num_channels), flat)
            .map_err(|err| ChainError::InvalidParameter(err.to_string()))?;

        let bank = Self {
            coefficients,
            calibration_factor,
        };
        LogManager::new("filter_bank").detail(&format!(
            "designed {}x{} bank, energy {:.6}",
            num_taps,
            num_channels,
            bank.energy()
        ));
        Ok(bank)
    }

    pub fn from_config(config: &ChainConfig) -> ChainResult<Self> {
        Self::design(
            config.num_channels,
            config.num_taps,
            config.calibration_factor,
        )
    }

    pub fn num_taps(&self) -> usize {
        self.coefficients.nrows()
    }

    pub fn num_channels(&self) -> usize {
        self.coefficients.ncols()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.coefficients.dim()
    }

    pub fn calibration_factor(&self) -> f64 {
        self.calibration_factor
    }

    pub fn coefficients(&self) -> ArrayView2<'_, f32> {
        self.coefficients.view()
    }

    /// Sum of squared coefficients.
    pub fn energy(&self) -> f64 {
        self.coefficients
            .iter()
            .map(|&c| (c as f64) * (c as f64))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn design_reshapes_into_taps_by_channels() {
        let bank = FilterBank::design(4, 2, 1.0).unwrap();
        assert_eq!(bank.shape(), (2, 4));
        assert_eq!(bank.coefficients().len(), 8);
    }

    #[test]
    fn design_alternates_sign_along_flat_index() {
        let bank = FilterBank::design(4, 2, 1.0).unwrap();
        let flat: Vec<f32> = bank.coefficients().iter().copied().collect();
        for (n, c) in flat.iter().enumerate() {
            if n % 2 == 0 {
                assert!(*c > 0.0, "coefficient {} should be positive: {}", n, c);
            } else {
                assert!(*c < 0.0, "coefficient {} should be negative: {}", n, c);
            }
        }
        for n in 0..flat.len() {
            assert!((flat[n].abs() - flat[flat.len() - 1 - n].abs()).abs() < 1e-6);
        }
    }

    #[test]
    fn energy_is_independent_of_channel_count() {
        let energies: Vec<f64> = [8usize, 32, 128]
            .iter()
            .map(|&channels| FilterBank::design(channels, 4, 1.0).unwrap().energy())
            .collect();
        let max = energies.iter().cloned().fold(f64::MIN, f64::max);
        let min = energies.iter().cloned().fold(f64::MAX, f64::min);
        assert!(min > 0.5 && max < 1.5, "energies {:?}", energies);
        assert!((max - min) / max < 0.05, "energies {:?}", energies);
    }

    #[test]
    fn calibration_factor_scales_amplitude() {
        let unit = FilterBank::design(16, 4, 1.0).unwrap();
        let scaled = FilterBank::design(16, 4, 1.0 / 50.0).unwrap();
        assert!((scaled.energy() * 2500.0 - unit.energy()).abs() / unit.energy() < 1e-4);
        assert!((scaled.calibration_factor() - 0.02).abs() < 1e-12);
    }

    #[test]
    fn design_rejects_zero_counts() {
        assert!(matches!(
            FilterBank::design(0, 4, 1.0),
            Err(ChainError::InvalidParameter(_))
        ));
        assert!(matches!(
            FilterBank::design(4, 0, 1.0),
            Err(ChainError::InvalidParameter(_))
        ));
    }

    #[test]
    fn long_prototype_design_completes_with_finite_coefficients() {
        let bank = FilterBank::design(8, 2000, 1.0).unwrap();
        assert_eq!(bank.shape(), (2000, 8));
        assert!(bank.coefficients().iter().all(|c| c.is_finite()));
        assert!(bank.energy() > 0.0);
    }

    #[test]
    fn design_is_deterministic() {
        let config = ChainConfig::new(64, 8);
        let first = FilterBank::from_config(&config).unwrap();
        let second = FilterBank::from_config(&config).unwrap();
        assert_eq!(first, second);
    }
}
