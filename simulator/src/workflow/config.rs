use crate::generator::profile::GeneratorConfig;
use anyhow::{bail, Context};
use interfcore::imaging::{
    pixel_count_for_oversampling, subband_frequency, AntennaPosition, BaselineSet, ImageGrid,
    DEFAULT_CLOCK_HZ, DEFAULT_OVERSAMPLING,
};
use interfcore::prelude::{ChainConfig, DEFAULT_CALIBRATION_FACTOR};
use interfcore::processing::correlator::DEFAULT_FIELD_BIT_DEPTH;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub num_channels: usize,
    pub num_taps: usize,
    pub calibration_factor: f64,
    pub sample_rate: f64,
    pub center_frequency: f64,
    /// Integer sample offset applied to the second receiver before channelizing.
    pub offset: i64,
    pub bit_depth: u32,
    /// Gain applied to the real voltages before digitizing.
    pub voltage_scale: f64,
    pub lag_window: usize,
    pub antennas: Vec<AntennaPosition>,
    pub imaging: ImagingConfig,
    pub generator: GeneratorConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captures: Option<CaptureConfig>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagingConfig {
    /// Explicit observing frequency; takes precedence over `subband`.
    pub frequency_hz: Option<f64>,
    pub subband: Option<u32>,
    pub clock_hz: f64,
    pub oversampling: f64,
    /// Fixed pixel count; derived from the array when absent.
    pub num_pix: Option<usize>,
    pub l_range: (f64, f64),
    pub m_range: (f64, f64),
    pub include_pixels: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub first: PathBuf,
    pub second: PathBuf,
}

impl Default for ImagingConfig {
    fn default() -> Self {
        Self {
            frequency_hz: None,
            subband: None,
            clock_hz: DEFAULT_CLOCK_HZ,
            oversampling: DEFAULT_OVERSAMPLING,
            num_pix: None,
            l_range: (1.0, -1.0),
            m_range: (-1.0, 1.0),
            include_pixels: false,
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            num_channels: 512,
            num_taps: 16,
            calibration_factor: DEFAULT_CALIBRATION_FACTOR,
            sample_rate: 2.5e6,
            center_frequency: 1.42e9,
            offset: 0,
            bit_depth: DEFAULT_FIELD_BIT_DEPTH,
            voltage_scale: 10.0,
            lag_window: 200,
            antennas: default_antennas(),
            imaging: ImagingConfig::default(),
            generator: GeneratorConfig::default(),
            captures: None,
        }
    }
}

/// Nine antennas on a 3 × 3 grid of 1.25 m pitch.
fn default_antennas() -> Vec<AntennaPosition> {
    (0..9)
        .map(|i| AntennaPosition::new((i % 3) as f64 * 1.25, (i / 3) as f64 * 1.25))
        .collect()
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        config
            .validate()
            .with_context(|| format!("validating workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(num_channels: usize, num_taps: usize) -> Self {
        Self {
            num_channels,
            num_taps,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.num_channels == 0 || self.num_taps == 0 {
            bail!("num_channels and num_taps must be at least 1");
        }
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            bail!("sample_rate must be positive, got {}", self.sample_rate);
        }
        if !(1..=32).contains(&self.bit_depth) {
            bail!("bit_depth must be within 1..=32, got {}", self.bit_depth);
        }
        if self.antennas.len() < 2 {
            bail!("at least two antennas are needed to form a baseline");
        }
        Ok(())
    }

    pub fn to_chain_config(&self) -> ChainConfig {
        ChainConfig::new(self.num_channels, self.num_taps).with_calibration(self.calibration_factor)
    }

    pub fn baselines(&self) -> BaselineSet {
        BaselineSet::from_positions(&self.antennas)
    }

    /// Explicit frequency, else the subband's centre, else the receiver centre frequency.
    pub fn imaging_frequency(&self) -> f64 {
        match (self.imaging.frequency_hz, self.imaging.subband) {
            (Some(frequency), _) => frequency,
            (None, Some(subband)) => subband_frequency(subband, self.imaging.clock_hz),
            (None, None) => self.center_frequency,
        }
    }

    pub fn image_grid(&self) -> anyhow::Result<ImageGrid> {
        let num_pix = match self.imaging.num_pix {
            Some(num_pix) => num_pix,
            None => {
                let max_baseline = self
                    .baselines()
                    .max_length()
                    .context("array has no baselines")?;
                pixel_count_for_oversampling(
                    max_baseline,
                    self.imaging_frequency(),
                    self.imaging.oversampling,
                )
                .context("deriving pixel count from array resolution")?
            }
        };
        Ok(ImageGrid::with_ranges(
            num_pix,
            self.imaging.l_range,
            self.imaging.m_range,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn config_from_args_produces_chain_config() {
        let cfg = WorkflowConfig::from_args(256, 8);
        let chain = cfg.to_chain_config();
        assert_eq!(chain.num_channels, 256);
        assert_eq!(chain.num_taps, 8);
        assert!((chain.calibration_factor - DEFAULT_CALIBRATION_FACTOR).abs() < 1e-12);
    }

    #[test]
    fn config_load_reads_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"num_channels: 64\nnum_taps: 4\nantennas:\n  - {x: 0.0, y: 0.0}\n  - {x: 2.0, y: 0.0}\nimaging:\n  subband: 290\n",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let cfg = WorkflowConfig::load(&path).unwrap();
        assert_eq!(cfg.num_channels, 64);
        assert_eq!(cfg.antennas.len(), 2);
        assert!((cfg.imaging_frequency() - 56.640_625e6).abs() < 1e-3);
        assert_eq!(cfg.sample_rate, 2.5e6);
    }

    #[test]
    fn config_load_rejects_single_antenna() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"antennas:\n  - {x: 0.0, y: 0.0}\n").unwrap();
        let path = temp.into_temp_path();
        assert!(WorkflowConfig::load(&path).is_err());
    }

    #[test]
    fn image_grid_uses_override_or_array_resolution() {
        let mut cfg = WorkflowConfig::default();
        cfg.imaging.num_pix = Some(33);
        assert_eq!(cfg.image_grid().unwrap().num_pix, 33);

        cfg.imaging.num_pix = None;
        cfg.imaging.frequency_hz = Some(56.640_625e6);
        cfg.antennas = vec![AntennaPosition::new(0.0, 0.0), AntennaPosition::new(80.0, 0.0)];
        assert_eq!(cfg.image_grid().unwrap().num_pix, 76);
    }
}
