//! Run the spinorial search over every generator pair for a list of qubit
//! counts, sampling locally, and save one report per qubit count.

use std::path::PathBuf;
use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use itertools::Itertools;
use spinor_sim::{
    backend::LocalSampler,
    config::ExperimentConfig,
    experiment::run_and_save,
    report::{ HistogramSink, TsvHistogramSink },
};
use tracing::{ error, info };

#[derive(Parser, Debug)]
#[command(
    name = "spinor_search",
    version,
    about = "Grover-like search in the rotation planes of Clifford generators",
)]
struct Args {
    /// Qubit counts to run, one report each.
    #[arg(short = 'n', long, num_args = 1.., default_values_t = [3, 4, 5])]
    qubits: Vec<usize>,

    /// JSON configuration file; command-line options override it.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Shots per circuit.
    #[arg(short, long)]
    shots: Option<u64>,

    /// Rotation angle θ in radians.
    #[arg(short, long)]
    theta: Option<f64>,

    /// Seed for the local sampler.
    #[arg(long)]
    seed: Option<u64>,

    /// Directory under which per-run output directories are created.
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Also write a comparison table per circuit next to each report.
    #[arg(long, default_value_t = false)]
    histograms: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn apply_overrides(mut config: ExperimentConfig, args: &Args) -> ExperimentConfig {
    if let Some(shots) = args.shots { config.shots = shots; }
    if let Some(theta) = args.theta { config.theta = theta; }
    if let Some(seed) = args.seed { config.seed = Some(seed); }
    if let Some(dir) = &args.output_dir { config.output_dir = Some(dir.clone()); }
    config
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    lib::init_logging(&args.log_level);

    let base = apply_overrides(lib::load_config(args.config.as_deref())?, &args);
    info!(
        "n = [{}], {} shots, θ = {:.6}, optimization level {}",
        args.qubits.iter().join(", "), base.shots, base.theta,
        base.optimization_level,
    );
    let sampler = LocalSampler::new(base.seed);
    let date = Utc::now().date_naive();

    for &n in args.qubits.iter() {
        let config = base.with_qubits(n);
        let dir = config.run_dir(date);
        let (report, path)
            = run_and_save(&config, &sampler, &dir)
            .map_err(|e| {
                error!("n = {}: {}", n, e);
                e
            })
            .with_context(|| format!("running n = {}", n))?;
        report.log_summary();
        info!("n = {}: saved {}", n, path.display());

        if args.histograms {
            let sink = TsvHistogramSink::new(&dir);
            for input in report.histogram_inputs(&config.algorithm)? {
                let out = sink.render(&input)?;
                info!("\twrote {}", out.display());
            }
        }
    }
    Ok(())
}
