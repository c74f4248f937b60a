use crate::report::model::ReportModel;
use anyhow::Context;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

/// Writes the report as pretty-printed JSON, creating parent directories as needed.
pub fn write_report<P: AsRef<Path>>(path: P, model: &ReportModel) -> anyhow::Result<()> {
    let path_ref = path.as_ref();
    if let Some(parent) = path_ref.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating report directory {}", parent.display()))?;
    }
    let file = File::create(path_ref)
        .with_context(|| format!("creating report {}", path_ref.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), model)
        .with_context(|| format!("writing report {}", path_ref.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::profile::{build_receiver_pair, GeneratorConfig};
    use crate::workflow::config::WorkflowConfig;
    use crate::workflow::runner::Runner;
    use interfcore::prelude::CancelToken;

    #[test]
    fn report_round_trips_through_json() {
        let mut cfg = WorkflowConfig::from_args(16, 2);
        cfg.generator = GeneratorConfig {
            samples: 16 * 20,
            ..Default::default()
        };
        cfg.lag_window = 11;
        cfg.imaging.num_pix = Some(5);
        cfg.imaging.include_pixels = true;

        let runner = Runner::new(cfg.clone(), CancelToken::new());
        let pair = build_receiver_pair(&cfg.generator, cfg.sample_rate).unwrap();
        let result = runner.execute(&pair).unwrap();
        let model = ReportModel::from_result(runner.config(), &result);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("report.json");
        write_report(&path, &model).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let parsed: ReportModel = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed.spectrogram_shape, (19, 16));
        assert_eq!(parsed.psf.num_pix, 5);
        assert_eq!(parsed.psf.pixels.map(|rows| rows.len()), Some(5));
        assert_eq!(parsed.lag_window.len(), 11);
    }
}
