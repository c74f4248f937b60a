use anyhow::{bail, Context};
use interfcore::processing::SampleStream;
use num_complex::Complex32;
use std::fs;
use std::path::Path;

const BYTES_PER_SAMPLE: usize = 8;

/// Loads a flat little-endian complex64 capture (interleaved f32 I/Q).
pub fn load_capture<P: AsRef<Path>>(
    path: P,
    receiver_id: &str,
    sample_rate: f64,
) -> anyhow::Result<SampleStream> {
    let path_ref = path.as_ref();
    let bytes =
        fs::read(path_ref).with_context(|| format!("reading capture {}", path_ref.display()))?;
    if bytes.len() % BYTES_PER_SAMPLE != 0 {
        bail!(
            "capture {} ends with a partial sample ({} bytes)",
            path_ref.display(),
            bytes.len()
        );
    }

    let samples = bytes
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|chunk| {
            let re = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            let im = f32::from_le_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]);
            Complex32::new(re, im)
        })
        .collect();

    SampleStream::new(receiver_id, sample_rate, samples)
        .with_context(|| format!("wrapping capture {}", path_ref.display()))
}
