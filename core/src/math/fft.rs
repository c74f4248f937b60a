use num_complex::Complex;
use rustfft::{Fft, FftNum, FftPlanner};
use std::sync::Arc;

/// Helper that wraps planned forward and inverse `rustfft` transforms for reuse.
///
/// Cloning shares the plans; the transforms themselves are safe to run from several threads.
#[derive(Clone)]
pub struct FftHelper<T: FftNum = f32> {
    forward: Arc<dyn Fft<T>>,
    inverse: Arc<dyn Fft<T>>,
}

impl<T: FftNum> FftHelper<T> {
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(size);
        let inverse = planner.plan_fft_inverse(size);
        Self { forward, inverse }
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.len() == 0
    }

    /// Unnormalized forward DFT, in place.
    pub fn forward_in_place(&self, buffer: &mut [Complex<T>]) {
        self.forward.process(buffer);
    }

    /// Unnormalized inverse DFT, in place.
    pub fn inverse_in_place(&self, buffer: &mut [Complex<T>]) {
        self.inverse.process(buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::{Complex32, Complex64};

    #[test]
    fn fft_helper_transforms_impulse_to_flat_spectrum() {
        let helper = FftHelper::<f32>::new(4);
        let mut buffer = vec![
            Complex32::new(1.0, 0.0),
            Complex32::new(0.0, 0.0),
            Complex32::new(0.0, 0.0),
            Complex32::new(0.0, 0.0),
        ];
        helper.forward_in_place(&mut buffer);
        assert_eq!(helper.len(), 4);
        assert!(buffer.iter().all(|c| (c.re - 1.0).abs() < 1e-6 && c.im.abs() < 1e-6));
    }

    #[test]
    fn fft_helper_is_unnormalized() {
        let helper = FftHelper::<f32>::new(8);
        let mut buffer = vec![Complex32::new(1.0, 0.0); 8];
        helper.forward_in_place(&mut buffer);
        assert!((buffer[0].re - 8.0).abs() < 1e-5);
        assert!(buffer[1..].iter().all(|c| c.norm() < 1e-5));
    }

    #[test]
    fn inverse_undoes_forward_up_to_length() {
        let helper = FftHelper::<f64>::new(5);
        let original: Vec<Complex64> = (0..5).map(|i| Complex64::new(i as f64, 1.0)).collect();
        let mut buffer = original.clone();
        helper.forward_in_place(&mut buffer);
        helper.inverse_in_place(&mut buffer);
        for (x, y) in buffer.iter().zip(&original) {
            assert!((x / 5.0 - y).norm() < 1e-12);
        }
    }
}
