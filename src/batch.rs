//! Directory-level processing: find GPX files, clean each one, write results.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clean_gpx;
use crate::error::{CleanerError, Result};
use crate::naming::output_file_name;
use crate::options::CleanOptions;
use crate::parser::decode_document;
use crate::pipeline::CleanStats;

/// Name of the output directory created inside the input directory.
pub const OUTPUT_DIR_NAME: &str = "output";

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub input_dir: PathBuf,
    /// Defaults to `<input_dir>/output`.
    pub output_dir: Option<PathBuf>,
    pub options: CleanOptions,
}

impl BatchConfig {
    pub fn new(input_dir: impl Into<PathBuf>, options: CleanOptions) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: None,
            options,
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| self.input_dir.join(OUTPUT_DIR_NAME))
    }
}

/// A file that was cleaned and written.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub stats: CleanStats,
}

/// A file that could not be processed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileFailure {
    pub input: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub cleaned: Vec<FileReport>,
    pub skipped: Vec<FileFailure>,
}

impl BatchSummary {
    pub fn points_in(&self) -> usize {
        self.cleaned.iter().map(|r| r.stats.input_points).sum()
    }

    pub fn points_out(&self) -> usize {
        self.cleaned.iter().map(|r| r.stats.output_points).sum()
    }
}

/// Regular files in `dir` with a `gpx` extension, sorted by path.
pub fn find_gpx_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "gpx") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub fn prepare_output_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|source| CleanerError::OutputDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// Clean one file into `output_dir`.
pub fn process_file(input: &Path, output_dir: &Path, opts: &CleanOptions) -> Result<FileReport> {
    let name = output_file_name(input, opts).ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "file name is not valid UTF-8")
    })?;
    let output = output_dir.join(name);

    let bytes = fs::read(input)?;
    let xml = decode_document(&bytes)?;
    let (cleaned, stats) = clean_gpx(&xml, opts)?;
    fs::write(&output, cleaned)?;

    Ok(FileReport {
        input: input.to_path_buf(),
        output,
        stats,
    })
}

/// Clean every GPX file of the configured directory.
///
/// Invalid options, a missing input directory and an output directory that
/// can't be created abort the run. Any other failure only skips the file it
/// occurred in.
pub fn run(config: &BatchConfig) -> Result<BatchSummary> {
    config.options.validate()?;
    if !config.input_dir.is_dir() {
        return Err(CleanerError::InputDirNotFound(config.input_dir.clone()));
    }

    let files = find_gpx_files(&config.input_dir)?;
    info!(
        "Found {} gpx files in directory {}",
        files.len(),
        config.input_dir.display()
    );

    let mut summary = BatchSummary::default();
    if files.is_empty() {
        return Ok(summary);
    }

    let output_dir = config.output_dir();
    prepare_output_dir(&output_dir)?;
    debug!(dir = %output_dir.display(), "output directory ready");

    for input in files {
        match process_file(&input, &output_dir, &config.options) {
            Ok(report) => {
                if !report.stats.segment_found {
                    info!(file = %input.display(), "no track segment, copied unchanged");
                }
                info!(
                    file = %input.display(),
                    output = %report.output.display(),
                    points_in = report.stats.input_points,
                    points_out = report.stats.output_points,
                    "cleaned"
                );
                summary.cleaned.push(report);
            }
            Err(err) => {
                warn!(file = %input.display(), error = %err, "skipping file");
                summary.skipped.push(FileFailure {
                    input,
                    error: err.to_string(),
                });
            }
        }
    }

    Ok(summary)
}
