use anyhow::Context;
use clap::Parser;
use generator::profile::{build_receiver_pair, ReceiverPair};
use interfcore::prelude::CancelToken;
use log::{info, warn};
use report::model::ReportModel;
use report::writer::write_report;
use std::path::PathBuf;
use std::thread;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::capture::load_capture;
use workflow::config::{CaptureConfig, WorkflowConfig};
use workflow::runner::Runner;

mod generator;
mod report;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Offline driver for the two-receiver interferometer chain")]
struct Args {
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    #[arg(long, default_value_t = 512)]
    channels: usize,
    #[arg(long, default_value_t = 16)]
    taps: usize,
    /// Raw complex64 capture for the first receiver
    #[arg(long, requires = "capture_b")]
    capture_a: Option<PathBuf>,
    /// Raw complex64 capture for the second receiver
    #[arg(long, requires = "capture_a")]
    capture_b: Option<PathBuf>,
    /// Sample offset applied to the second receiver
    #[arg(long, allow_hyphen_values = true)]
    offset: Option<i64>,
    #[arg(long, default_value = "tools/data/field_report.json")]
    report: PathBuf,
    /// Embed the PSF pixels in the report
    #[arg(long, default_value_t = false)]
    include_image: bool,
    /// Worker threads for the rayon pool (defaults to one per core)
    #[arg(long)]
    threads: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut workflow_config = if let Some(path) = &args.workflow {
        WorkflowConfig::load(path)?
    } else {
        WorkflowConfig::from_args(args.channels, args.taps)
    };
    if let Some(offset) = args.offset {
        workflow_config.offset = offset;
    }
    if let (Some(first), Some(second)) = (args.capture_a.clone(), args.capture_b.clone()) {
        workflow_config.captures = Some(CaptureConfig { first, second });
    }
    if args.include_image {
        workflow_config.imaging.include_pixels = true;
    }
    workflow_config.validate()?;

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("configuring rayon thread pool")?;
    }

    let cancel = CancelToken::new();
    spawn_interrupt_listener(cancel.clone());

    let pair = load_receivers(&workflow_config)?;
    let runner = Runner::new(workflow_config, cancel);
    let result = runner.execute(&pair)?;

    let peak_channel = result
        .mean_magnitude
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(channel, _)| channel);
    println!(
        "Run -> spectra {}x{}, strongest channel {:?}, lag peak {:?}, psf {}px at {:.3} MHz",
        result.spectrogram_shape.0,
        result.spectrogram_shape.1,
        peak_channel,
        result.lag_peak.map(|lag| lag.delay),
        result.psf.num_pix(),
        result.imaging_frequency / 1e6
    );

    let model = ReportModel::from_result(runner.config(), &result);
    write_report(&args.report, &model)?;
    info!("report written to {}", args.report.display());

    Ok(())
}

fn load_receivers(config: &WorkflowConfig) -> anyhow::Result<ReceiverPair> {
    match &config.captures {
        Some(captures) => Ok(ReceiverPair {
            first: load_capture(&captures.first, "rx0", config.sample_rate)?,
            second: load_capture(&captures.second, "rx1", config.sample_rate)?,
        }),
        None => {
            info!(
                "no captures configured, synthesizing {} samples per receiver",
                config.generator.samples
            );
            build_receiver_pair(&config.generator, config.sample_rate)
        }
    }
}

/// Flips the cancel token on Ctrl+C so in-flight parallel work stops at the next check.
fn spawn_interrupt_listener(cancel: CancelToken) {
    thread::spawn(move || {
        let runtime = match TokioBuilder::new_current_thread().enable_all().build() {
            Ok(runtime) => runtime,
            Err(err) => {
                warn!("signal handling unavailable: {}", err);
                return;
            }
        };
        let outcome = runtime.block_on(async { signal::ctrl_c().await });
        match outcome {
            Ok(()) => {
                warn!("interrupt received, cancelling workflow");
                cancel.cancel();
            }
            Err(err) => warn!("awaiting Ctrl+C failed: {}", err),
        }
    });
}
