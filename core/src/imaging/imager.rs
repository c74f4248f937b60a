//! Direct (non-gridded) Fourier imaging of sparse baseline samples.
//!
//! Each pixel at direction cosines (l, m) is the mean over baselines of
//! `Re(V_k · exp(2πi (u_k l + v_k m)))`, with (u, v) in wavelengths. Cost is
//! O(pixels · baselines); no gridding or FFT is involved.

use crate::imaging::baseline::BaselineSet;
use crate::prelude::{CancelToken, ChainError, ChainResult, SPEED_OF_LIGHT};
use crate::telemetry::log::LogManager;
use ndarray::{Array2, ArrayView2};
use num_complex::Complex64;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Image pixels per resolution element.
pub const DEFAULT_OVERSAMPLING: f64 = 2.5;

/// Sample clock of the station digitizer, Hz.
pub const DEFAULT_CLOCK_HZ: f64 = 200.0e6;

const SUBBANDS_PER_NYQUIST_ZONE: f64 = 512.0;

/// Pixel grid over direction cosines. Ranges run from `.0` to `.1` inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageGrid {
    pub num_pix: usize,
    #[serde(default = "default_l_range")]
    pub l_range: (f64, f64),
    #[serde(default = "default_m_range")]
    pub m_range: (f64, f64),
}

fn default_l_range() -> (f64, f64) {
    (1.0, -1.0)
}

fn default_m_range() -> (f64, f64) {
    (-1.0, 1.0)
}

impl ImageGrid {
    /// Full sky, with l increasing to the left as seen on a plot.
    pub fn new(num_pix: usize) -> Self {
        Self {
            num_pix,
            l_range: default_l_range(),
            m_range: default_m_range(),
        }
    }

    pub fn with_ranges(num_pix: usize, l_range: (f64, f64), m_range: (f64, f64)) -> Self {
        Self {
            num_pix,
            l_range,
            m_range,
        }
    }

    pub fn l_coordinates(&self) -> Vec<f64> {
        linspace(self.l_range, self.num_pix)
    }

    pub fn m_coordinates(&self) -> Vec<f64> {
        linspace(self.m_range, self.num_pix)
    }
}

fn linspace((start, end): (f64, f64), count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        n => {
            let step = (end - start) / (n - 1) as f64;
            let mut values: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
            values[n - 1] = end;
            values
        }
    }
}

/// Plot extent with pixel centres on their coordinates: half a pixel of padding on every edge.
///
/// The padding is derived from the m-axis spacing and applied to both axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageExtent {
    pub l_start: f64,
    pub m_start: f64,
    pub l_end: f64,
    pub m_end: f64,
}

impl ImageExtent {
    fn from_coordinates(l: &[f64], m: &[f64]) -> Self {
        let half = if m.len() >= 2 { (m[1] - m[0]) / 2.0 } else { 0.0 };
        let (l_first, l_last) = (l[0], l[l.len() - 1]);
        let (m_first, m_last) = (m[0], m[m.len() - 1]);
        Self {
            l_start: l_first + half,
            m_start: m_first - half,
            l_end: l_last - half,
            m_end: m_last + half,
        }
    }

    pub fn as_tuple(&self) -> (f64, f64, f64, f64) {
        (self.l_start, self.m_start, self.l_end, self.m_end)
    }
}

/// Brightness per (m, l) pixel together with the grid it was sampled on.
#[derive(Debug, Clone, PartialEq)]
pub struct SkyImage {
    pixels: Array2<f64>,
    extent: ImageExtent,
    l_coordinates: Vec<f64>,
    m_coordinates: Vec<f64>,
}

impl SkyImage {
    /// Rows index m, columns index l.
    pub fn pixels(&self) -> ArrayView2<'_, f64> {
        self.pixels.view()
    }

    pub fn into_pixels(self) -> Array2<f64> {
        self.pixels
    }

    pub fn extent(&self) -> ImageExtent {
        self.extent
    }

    pub fn num_pix(&self) -> usize {
        self.pixels.nrows()
    }

    pub fn l_coordinates(&self) -> &[f64] {
        &self.l_coordinates
    }

    pub fn m_coordinates(&self) -> &[f64] {
        &self.m_coordinates
    }

    /// Brightest pixel as (value, l, m).
    pub fn peak(&self) -> Option<(f64, f64, f64)> {
        self.pixels
            .indexed_iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|((m_ix, l_ix), &value)| {
                (value, self.l_coordinates[l_ix], self.m_coordinates[m_ix])
            })
    }
}

/// Complex visibility attached to each baseline.
#[derive(Debug, Clone, PartialEq)]
pub enum Visibilities {
    /// Unit visibility on every baseline: the image is the point-spread function.
    Uniform,
    /// One visibility per baseline, in baseline order.
    PerBaseline(Vec<Complex64>),
}

impl Visibilities {
    /// Looks up each baseline's antenna pair `(i, j)` in an N×N correlation matrix.
    pub fn from_correlation_matrix(
        matrix: ArrayView2<'_, Complex64>,
        baselines: &BaselineSet,
    ) -> ChainResult<Self> {
        let (rows, cols) = matrix.dim();
        if rows != cols {
            return Err(ChainError::InvalidParameter(format!(
                "correlation matrix must be square, got {}x{}",
                rows, cols
            )));
        }
        baselines
            .iter()
            .enumerate()
            .map(|(k, baseline)| match baseline.antennas {
                Some((i, j)) if i < rows && j < rows => Ok(matrix[[i, j]]),
                Some((i, j)) => Err(ChainError::InvalidParameter(format!(
                    "baseline {} references antennas ({}, {}) outside a {}x{} matrix",
                    k, i, j, rows, cols
                ))),
                None => Err(ChainError::InvalidParameter(format!(
                    "baseline {} has no antenna pair to look up",
                    k
                ))),
            })
            .collect::<ChainResult<Vec<_>>>()
            .map(Visibilities::PerBaseline)
    }

    fn resolve(&self, count: usize) -> ChainResult<Vec<Complex64>> {
        match self {
            Visibilities::Uniform => Ok(vec![Complex64::new(1.0, 0.0); count]),
            Visibilities::PerBaseline(values) if values.len() == count => Ok(values.clone()),
            Visibilities::PerBaseline(values) => Err(ChainError::InvalidParameter(format!(
                "{} visibilities for {} baselines",
                values.len(),
                count
            ))),
        }
    }
}

/// Baseline in wavelengths with its visibility, laid out flat for the pixel loop.
#[derive(Debug, Clone, Copy)]
struct ScaledSample {
    u: f64,
    v: f64,
    visibility: Complex64,
}

/// Forms sky images at one observing frequency.
#[derive(Debug, Clone)]
pub struct DirectImager {
    grid: ImageGrid,
    frequency_hz: f64,
    logger: LogManager,
}

impl DirectImager {
    pub fn new(grid: ImageGrid, frequency_hz: f64) -> ChainResult<Self> {
        if grid.num_pix == 0 {
            return Err(ChainError::InvalidParameter(
                "image needs at least one pixel".into(),
            ));
        }
        if !(frequency_hz.is_finite() && frequency_hz > 0.0) {
            return Err(ChainError::InvalidParameter(format!(
                "observing frequency must be positive, got {}",
                frequency_hz
            )));
        }
        Ok(Self {
            grid,
            frequency_hz,
            logger: LogManager::new("imager"),
        })
    }

    pub fn grid(&self) -> &ImageGrid {
        &self.grid
    }

    pub fn frequency_hz(&self) -> f64 {
        self.frequency_hz
    }

    pub fn point_spread_function(&self, baselines: &BaselineSet) -> ChainResult<SkyImage> {
        self.image(&Visibilities::Uniform, baselines)
    }

    pub fn image(
        &self,
        visibilities: &Visibilities,
        baselines: &BaselineSet,
    ) -> ChainResult<SkyImage> {
        self.image_cancellable(visibilities, baselines, &CancelToken::new())
    }

    /// Rows are computed in parallel; `cancel` is checked before each row.
    pub fn image_cancellable(
        &self,
        visibilities: &Visibilities,
        baselines: &BaselineSet,
        cancel: &CancelToken,
    ) -> ChainResult<SkyImage> {
        if baselines.is_empty() {
            return Err(ChainError::InvalidParameter(
                "cannot image without baselines".into(),
            ));
        }
        let values = visibilities.resolve(baselines.len())?;
        let to_wavelengths = self.frequency_hz / SPEED_OF_LIGHT;
        let samples: Vec<ScaledSample> = baselines
            .iter()
            .zip(values)
            .map(|(baseline, visibility)| ScaledSample {
                u: baseline.u * to_wavelengths,
                v: baseline.v * to_wavelengths,
                visibility,
            })
            .collect();

        let l_coordinates = self.grid.l_coordinates();
        let m_coordinates = self.grid.m_coordinates();
        let num_pix = self.grid.num_pix;
        let count = samples.len() as f64;

        let rows = m_coordinates
            .par_iter()
            .map(|&m| -> ChainResult<Vec<f64>> {
                cancel.check()?;
                Ok(l_coordinates
                    .iter()
                    .map(|&l| {
                        samples
                            .iter()
                            .map(|s| {
                                let phase = 2.0 * PI * (s.u * l + s.v * m);
                                (s.visibility * Complex64::from_polar(1.0, phase)).re
                            })
                            .sum::<f64>()
                            / count
                    })
                    .collect())
            })
            .collect::<ChainResult<Vec<_>>>()?;

        let pixels = Array2::from_shape_vec((num_pix, num_pix), rows.concat())
            .map_err(|err| ChainError::InvalidParameter(err.to_string()))?;
        let extent = ImageExtent::from_coordinates(&l_coordinates, &m_coordinates);

        self.logger.record(&format!(
            "{}x{} image from {} baselines at {:.4} MHz",
            num_pix,
            num_pix,
            samples.len(),
            self.frequency_hz / 1.0e6
        ));

        Ok(SkyImage {
            pixels,
            extent,
            l_coordinates,
            m_coordinates,
        })
    }
}

/// Pixels across l ∈ [-1, 1] needed to sample the array resolution `λ / max_baseline` by
/// `oversampling` pixels.
pub fn pixel_count_for_oversampling(
    max_baseline_m: f64,
    frequency_hz: f64,
    oversampling: f64,
) -> ChainResult<usize> {
    for (name, value) in [
        ("max baseline", max_baseline_m),
        ("frequency", frequency_hz),
        ("oversampling", oversampling),
    ] {
        if !(value.is_finite() && value > 0.0) {
            return Err(ChainError::InvalidParameter(format!(
                "{} must be positive, got {}",
                name, value
            )));
        }
    }
    let wavelength = SPEED_OF_LIGHT / frequency_hz;
    let pixel_separation = wavelength / max_baseline_m / oversampling;
    Ok(((2.0 / pixel_separation).round() as usize).max(1))
}

/// Centre frequency of a station subband: `subband / 512 · clock / 2`.
pub fn subband_frequency(subband: u32, clock_hz: f64) -> f64 {
    subband as f64 / SUBBANDS_PER_NYQUIST_ZONE * clock_hz / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::baseline::AntennaPosition;
    use ndarray::Array2;

    #[test]
    fn zero_baseline_gives_flat_image() {
        let imager = DirectImager::new(ImageGrid::new(5), 1.42e9).unwrap();
        let baselines = BaselineSet::from_coordinates(&[(0.0, 0.0)]);
        let image = imager.point_spread_function(&baselines).unwrap();
        assert!(image.pixels().iter().all(|&p| (p - 1.0).abs() < 1e-12));
    }

    #[test]
    fn single_baseline_follows_cosine_fringe() {
        let grid = ImageGrid::with_ranges(4, (-1.0, 1.0), (-1.0, 1.0));
        // 1 m at c Hz is exactly one wavelength
        let imager = DirectImager::new(grid, SPEED_OF_LIGHT).unwrap();
        let baselines = BaselineSet::from_coordinates(&[(1.0, 0.0)]);
        let image = imager
            .image(
                &Visibilities::PerBaseline(vec![Complex64::new(1.0, 0.0)]),
                &baselines,
            )
            .unwrap();

        let l = [-1.0, -1.0 / 3.0, 1.0 / 3.0, 1.0];
        for m_ix in 0..4 {
            for (l_ix, &l_value) in l.iter().enumerate() {
                let expected = (2.0 * PI * l_value).cos();
                assert!((image.pixels()[[m_ix, l_ix]] - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn imaginary_visibility_gives_sine_fringe() {
        let grid = ImageGrid::with_ranges(5, (-1.0, 1.0), (0.0, 0.0));
        let imager = DirectImager::new(grid, SPEED_OF_LIGHT).unwrap();
        let baselines = BaselineSet::from_coordinates(&[(1.0, 0.0)]);
        let image = imager
            .image(
                &Visibilities::PerBaseline(vec![Complex64::new(0.0, 1.0)]),
                &baselines,
            )
            .unwrap();
        for (l_ix, &l) in image.l_coordinates().iter().enumerate() {
            assert!((image.pixels()[[0, l_ix]] + (2.0 * PI * l).sin()).abs() < 1e-12);
        }
    }

    #[test]
    fn symmetric_baselines_give_symmetric_image() {
        let grid = ImageGrid::with_ranges(9, (-1.0, 1.0), (-1.0, 1.0));
        let imager = DirectImager::new(grid, 1.42e9).unwrap();
        let baselines = BaselineSet::from_coordinates(&[(0.3, 0.15), (-0.3, -0.15)]);
        let image = imager.point_spread_function(&baselines).unwrap();
        let pixels = image.pixels();
        for m in 0..9 {
            for l in 0..9 {
                assert!((pixels[[m, l]] - pixels[[8 - m, 8 - l]]).abs() < 1e-9);
            }
        }
        assert!((pixels[[4, 4]] - 1.0).abs() < 1e-12);
        let (peak, _, _) = image.peak().unwrap();
        assert!((peak - 1.0).abs() < 1e-12);
    }

    #[test]
    fn empty_baseline_set_is_rejected() {
        let imager = DirectImager::new(ImageGrid::new(4), 1.0e9).unwrap();
        assert!(matches!(
            imager.point_spread_function(&BaselineSet::default()),
            Err(ChainError::InvalidParameter(_))
        ));
    }

    #[test]
    fn imager_rejects_bad_grid_and_frequency() {
        assert!(DirectImager::new(ImageGrid::new(0), 1.0e9).is_err());
        assert!(DirectImager::new(ImageGrid::new(4), 0.0).is_err());
    }

    #[test]
    fn visibility_count_must_match_baselines() {
        let imager = DirectImager::new(ImageGrid::new(4), 1.0e9).unwrap();
        let baselines = BaselineSet::from_coordinates(&[(1.0, 0.0), (0.0, 1.0)]);
        let result = imager.image(
            &Visibilities::PerBaseline(vec![Complex64::new(1.0, 0.0)]),
            &baselines,
        );
        assert!(result.is_err());
    }

    #[test]
    fn correlation_matrix_is_read_by_antenna_pair() {
        let positions = [
            AntennaPosition::new(0.0, 0.0),
            AntennaPosition::new(1.0, 0.0),
            AntennaPosition::new(0.0, 1.0),
        ];
        let baselines = BaselineSet::from_positions(&positions);
        let matrix = Array2::from_shape_fn((3, 3), |(i, j)| Complex64::new(i as f64, j as f64));
        let visibilities =
            Visibilities::from_correlation_matrix(matrix.view(), &baselines).unwrap();
        assert_eq!(
            visibilities,
            Visibilities::PerBaseline(vec![
                Complex64::new(0.0, 1.0),
                Complex64::new(0.0, 2.0),
                Complex64::new(1.0, 2.0),
            ])
        );

        let bare = BaselineSet::from_coordinates(&[(1.0, 0.0)]);
        assert!(Visibilities::from_correlation_matrix(matrix.view(), &bare).is_err());
    }

    #[test]
    fn extent_pads_half_a_pixel() {
        let imager = DirectImager::new(ImageGrid::new(5), 1.0e9).unwrap();
        let baselines = BaselineSet::from_coordinates(&[(1.0, 1.0)]);
        let image = imager.point_spread_function(&baselines).unwrap();
        // m spacing 0.5, l runs 1 -> -1
        assert_eq!(image.extent().as_tuple(), (1.25, -1.25, -1.25, 1.25));
        assert_eq!(image.num_pix(), 5);
    }

    #[test]
    fn cancelled_imaging_returns_cancelled() {
        let imager = DirectImager::new(ImageGrid::new(8), 1.0e9).unwrap();
        let baselines = BaselineSet::from_coordinates(&[(1.0, 0.0)]);
        let cancel = CancelToken::new();
        cancel.cancel();
        assert_eq!(
            imager.image_cancellable(&Visibilities::Uniform, &baselines, &cancel),
            Err(ChainError::Cancelled)
        );
    }

    #[test]
    fn oversampled_pixel_count_matches_station_geometry() {
        let frequency = subband_frequency(290, DEFAULT_CLOCK_HZ);
        assert!((frequency - 56.640_625e6).abs() < 1e-3);
        let num_pix = pixel_count_for_oversampling(80.0, frequency, DEFAULT_OVERSAMPLING).unwrap();
        assert_eq!(num_pix, 76);
    }

    #[test]
    fn oversampling_rejects_non_positive_inputs() {
        assert!(pixel_count_for_oversampling(0.0, 1.0e9, 2.5).is_err());
        assert!(pixel_count_for_oversampling(10.0, -1.0, 2.5).is_err());
        assert!(pixel_count_for_oversampling(10.0, 1.0e9, 0.0).is_err());
    }
}
