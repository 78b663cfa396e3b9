//! Command-line front-end: ingest one named dataset and write its splits.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use synsplit::{IngestError, JsonFileDatabase, SplitConfig, dataset_by_name, run_pipeline};

#[derive(Debug, Parser)]
#[command(name = "synsplit", about = "Ingest a synapse dataset and create balanced splits")]
struct Args {
    /// Name of the built-in dataset preset to ingest.
    dataset: String,
    /// Directory holding the consolidated input files.
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,
    /// Directory under which the output database is created.
    #[arg(long, default_value = "db")]
    out_dir: PathBuf,
    /// Refuse to overwrite an existing database.
    #[arg(long)]
    keep_existing: bool,
    /// Absolute tolerance on per-class fraction deviation.
    #[arg(long)]
    tolerance: Option<f64>,
}

fn run(args: &Args) -> Result<(), IngestError> {
    let spec = dataset_by_name(&args.dataset)?;
    let mut config = SplitConfig::default();
    if let Some(tolerance) = args.tolerance {
        config.tolerance = tolerance;
    }
    let mut db = JsonFileDatabase::open(args.out_dir.join(spec.db_name));
    let report = run_pipeline(&spec, &args.data_dir, &mut db, &config, !args.keep_existing)?;
    info!(
        dataset = spec.name,
        synapses = report.total_synapses,
        deduplicated = report.dedup.deduplicated_ids.len(),
        conflicting = report.dedup.conflicting_ids_removed.len(),
        excluded_holdout = report.excluded_holdout,
        splits = ?report.splits_written,
        "ingestion finished"
    );
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "ingestion failed");
            ExitCode::FAILURE
        }
    }
}
