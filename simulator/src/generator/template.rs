use num_complex::Complex32;
use rand::Rng;
use std::f32::consts::PI;

/// Complex exponential of fixed `amplitude` at `cycles_per_sample`.
pub fn complex_tone(length: usize, cycles_per_sample: f32, amplitude: f32) -> Vec<Complex32> {
    (0..length)
        .map(|i| {
            let phase = 2.0 * PI * ((cycles_per_sample * i as f32).fract());
            Complex32::from_polar(amplitude, phase)
        })
        .collect()
}

/// Independent uniform noise on I and Q within `±amplitude`.
pub fn uniform_noise<R: Rng>(rng: &mut R, length: usize, amplitude: f32) -> Vec<Complex32> {
    if amplitude <= 0.0 {
        return vec![Complex32::new(0.0, 0.0); length];
    }
    (0..length)
        .map(|_| {
            Complex32::new(
                rng.gen_range(-amplitude..amplitude),
                rng.gen_range(-amplitude..amplitude),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn tone_has_constant_amplitude() {
        let tone = complex_tone(64, 0.125, 2.0);
        assert!(tone.iter().all(|x| (x.norm() - 2.0).abs() < 1e-5));
        assert!((tone[8] - tone[0]).norm() < 1e-4);
    }

    #[test]
    fn noise_stays_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let noise = uniform_noise(&mut rng, 256, 0.5);
        assert!(noise.iter().all(|x| x.re.abs() <= 0.5 && x.im.abs() <= 0.5));
        assert!(uniform_noise(&mut rng, 4, 0.0).iter().all(|x| x.norm() == 0.0));
    }
}
