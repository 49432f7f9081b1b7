//! Rebuild the comparison tables of a saved run from its report, without
//! running anything.

use std::path::PathBuf;
use clap::Parser;
use spinor_sim::{
    config::DEFAULT_ALGORITHM,
    report::{ regenerate_histograms, TsvHistogramSink, REBUILT_SUBDIR },
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "regen_histograms",
    version,
    about = "Regenerate histogram tables from a saved experiment report",
)]
struct Args {
    /// Job whose report should be used; reports of other jobs are refused.
    job_id: String,

    /// Run directory containing `experiment_data.json`.
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    dir: PathBuf,

    /// Output directory; defaults to a subdirectory of the run directory.
    #[arg(short, long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Algorithm label used in file names.
    #[arg(long, default_value = DEFAULT_ALGORITHM)]
    algorithm: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    lib::init_logging(&args.log_level);

    let out = args.out.unwrap_or_else(|| args.dir.join(REBUILT_SUBDIR));
    let sink = TsvHistogramSink::new(out);
    let written
        = regenerate_histograms(&args.dir, &args.job_id, &args.algorithm, &sink)?;
    info!("{} tables written to {}", written.len(), sink.dir().display());
    Ok(())
}
