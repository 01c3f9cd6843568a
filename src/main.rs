//! gpx-cleaner: remove duplicate trackpoints from every GPX file of a directory.
//!
//! Usage:
//!   gpx-cleaner <STRIDE> <DIRECTORY> [--elevation-offset <METERS>]
//!
//! Cleaned files are written to `<DIRECTORY>/output`.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use clap::error::ErrorKind;
use tracing::info;

use gpx_cleaner::batch::{self, BatchConfig};
use gpx_cleaner::logging::{LoggingConfig, init_logging};
use gpx_cleaner::{AbsentElevation, CleanOptions, Stride};

#[derive(Parser)]
#[command(
    name = "gpx-cleaner",
    about = "Remove duplicate trackpoints from GPX files, optionally keeping only every Nth point",
    version
)]
struct Cli {
    /// Keep one trackpoint out of every STRIDE distinct ones (1 keeps all)
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    stride: u64,

    /// Directory containing the .gpx files
    directory: PathBuf,

    /// Meters added to every trackpoint elevation
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    elevation_offset: f64,

    /// Never treat two trackpoints without elevation as duplicates
    #[arg(long)]
    distinct_absent_elevation: bool,

    /// Output directory (default: <DIRECTORY>/output)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            err.print().ok();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    let log_level = if cli.verbose { "debug" } else { "info" };
    init_logging(&LoggingConfig {
        level: log_level.to_string(),
        json: cli.json_logs,
    });

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let stride = usize::try_from(cli.stride).context("stride is too large")?;
    let options = CleanOptions {
        stride: Stride::new(stride)?,
        elevation_offset: cli.elevation_offset,
        absent_elevation: if cli.distinct_absent_elevation {
            AbsentElevation::Distinct
        } else {
            AbsentElevation::Equal
        },
    };
    options.validate()?;

    let config = BatchConfig {
        input_dir: cli.directory,
        output_dir: cli.output_dir,
        options,
    };
    let summary = batch::run(&config).context("cleaning GPX files failed")?;

    info!(
        cleaned = summary.cleaned.len(),
        skipped = summary.skipped.len(),
        points_in = summary.points_in(),
        points_out = summary.points_out(),
        "done"
    );
    Ok(())
}
