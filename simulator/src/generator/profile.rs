use crate::generator::template::{complex_tone, uniform_noise};
use anyhow::Context;
use interfcore::processing::SampleStream;
use num_complex::Complex32;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Configuration for synthesizing two receivers that observe one common source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub samples: usize,
    /// How many samples later the source reaches the second receiver.
    pub delay_samples: usize,
    pub source_amplitude: f32,
    /// Narrowband line added to the source, in cycles per sample.
    pub tone_frequency: Option<f32>,
    pub tone_amplitude: f32,
    pub receiver_noise: f32,
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            samples: 1 << 18,
            delay_samples: 12,
            source_amplitude: 0.3,
            tone_frequency: Some(0.1),
            tone_amplitude: 0.2,
            receiver_noise: 0.05,
            seed: 0,
        }
    }
}

/// Two captures of the same sky, one per receiver.
#[derive(Debug, Clone)]
pub struct ReceiverPair {
    pub first: SampleStream,
    pub second: SampleStream,
}

fn build_source(config: &GeneratorConfig, rng: &mut StdRng) -> Vec<Complex32> {
    let length = config.samples + config.delay_samples;
    let mut source = uniform_noise(rng, length, config.source_amplitude);
    if let Some(frequency) = config.tone_frequency {
        for (sample, line) in source
            .iter_mut()
            .zip(complex_tone(length, frequency, config.tone_amplitude))
        {
            *sample += line;
        }
    }
    source
}

pub fn build_receiver_pair(config: &GeneratorConfig, sample_rate: f64) -> anyhow::Result<ReceiverPair> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let source = build_source(config, &mut rng);
    let delay = config.delay_samples;

    // first sees source[n + delay], second sees source[n]: the second lags by `delay`
    let mut first = source[delay..].to_vec();
    let mut second = source[..config.samples].to_vec();
    for (sample, noise) in first
        .iter_mut()
        .zip(uniform_noise(&mut rng, config.samples, config.receiver_noise))
    {
        *sample += noise;
    }
    for (sample, noise) in second
        .iter_mut()
        .zip(uniform_noise(&mut rng, config.samples, config.receiver_noise))
    {
        *sample += noise;
    }

    Ok(ReceiverPair {
        first: SampleStream::new("sim0", sample_rate, first).context("building first receiver")?,
        second: SampleStream::new("sim1", sample_rate, second)
            .context("building second receiver")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_builds_expected_sample_count() {
        let config = GeneratorConfig {
            samples: 4096,
            ..Default::default()
        };
        let pair = build_receiver_pair(&config, 2.5e6).unwrap();
        assert_eq!(pair.first.len(), 4096);
        assert_eq!(pair.second.len(), 4096);
        assert_eq!(pair.first.receiver_id(), "sim0");
    }

    #[test]
    fn second_receiver_lags_by_delay_without_noise() {
        let config = GeneratorConfig {
            samples: 256,
            delay_samples: 5,
            receiver_noise: 0.0,
            ..Default::default()
        };
        let pair = build_receiver_pair(&config, 1.0).unwrap();
        assert_eq!(pair.first.samples()[..200], pair.second.samples()[5..205]);
    }

    #[test]
    fn seed_makes_generation_repeatable() {
        let config = GeneratorConfig {
            samples: 512,
            seed: 42,
            ..Default::default()
        };
        let a = build_receiver_pair(&config, 1.0).unwrap();
        let b = build_receiver_pair(&config, 1.0).unwrap();
        assert_eq!(a.first, b.first);
        assert_eq!(a.second, b.second);
    }
}
