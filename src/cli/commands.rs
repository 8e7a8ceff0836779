//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::path::{Path, PathBuf};

use log::{info, warn};
use walkdir::WalkDir;

use crate::analysis::AudioAnalysis;
use crate::cli::StretchArgs;
use crate::config::EngineConfig;
use crate::engine::import_audio;
use crate::error::{Result, StretchError};
use crate::service::{process_with, TimeStretchParams, TimeStretchResponse};
use crate::stretch::Stretcher;

impl StretchArgs {
    fn to_params(&self) -> TimeStretchParams {
        TimeStretchParams {
            ratio: self.ratio,
            quality: self.quality.clone(),
            algorithm: self.algorithm,
        }
    }
}

/// Outcome of a batch run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub failed: Vec<PathBuf>,
}

fn stretch_one(
    stretcher: &Stretcher,
    input: &Path,
    output: &Path,
    params: &TimeStretchParams,
    config: &EngineConfig,
) -> Result<TimeStretchResponse> {
    if !input.exists() {
        return Err(StretchError::FileNotFound {
            path: input.display().to_string(),
            source: None,
        });
    }

    let bytes = std::fs::read(input)?;
    let response = process_with(stretcher, &bytes, params, config)?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output, &response.data)?;

    Ok(response)
}

/// Stretch a single file.
pub fn stretch_file(
    input: &Path,
    output: &Path,
    args: &StretchArgs,
    config: &EngineConfig,
) -> Result<()> {
    let params = args.to_params();
    let resolved = params.resolve(config)?;
    info!(
        "Stretching {} -> {} (ratio {}%, quality {}, algorithm {})",
        input.display(),
        output.display(),
        resolved.ratio,
        resolved.quality,
        resolved.algorithm
    );

    let response = stretch_one(&Stretcher::new(), input, output, &params, config)?;

    println!("Wrote: {}", output.display());
    println!(
        "Duration: {:.3}s @ {} Hz",
        response.duration, response.sample_rate
    );

    Ok(())
}

fn is_wav(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("wav"))
        .unwrap_or(false)
}

/// Stretch every WAV file below `input_dir` into `output_dir`.
///
/// A file that fails is reported and skipped; the run continues.
pub fn batch(
    input_dir: &Path,
    output_dir: &Path,
    args: &StretchArgs,
    config: &EngineConfig,
) -> Result<BatchSummary> {
    if !input_dir.is_dir() {
        return Err(StretchError::FileNotFound {
            path: input_dir.display().to_string(),
            source: None,
        });
    }

    let params = args.to_params();
    params.resolve(config)?;
    info!(
        "Batch stretching {} -> {}",
        input_dir.display(),
        output_dir.display()
    );

    let stretcher = Stretcher::new();
    let mut summary = BatchSummary::default();

    let files = WalkDir::new(input_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_wav(entry.path()));

    for entry in files {
        let input = entry.path();
        let relative = input.strip_prefix(input_dir).unwrap_or(input);
        let output = output_dir.join(relative);

        match stretch_one(&stretcher, input, &output, &params, config) {
            Ok(response) => {
                summary.processed += 1;
                println!("{} ({:.3}s)", output.display(), response.duration);
            }
            Err(e) => {
                warn!("Failed to stretch {}: {}", input.display(), e);
                summary.failed.push(input.to_path_buf());
            }
        }
    }

    println!(
        "Processed {} file(s), {} failed",
        summary.processed,
        summary.failed.len()
    );

    Ok(summary)
}

/// Print the algorithm table.
pub fn list_algorithms(json: bool) -> Result<()> {
    let table = Stretcher::new().registry().descriptors();

    if json {
        println!("{}", serde_json::to_string_pretty(&table)?);
        return Ok(());
    }

    println!("Algorithms:");
    println!("{:-<40}", "");
    for row in &table {
        let note = if row.fallback { " (fallback)" } else { "" };
        println!("{:>3}  {}{}", row.index, row.name, note);
    }

    Ok(())
}

/// Print measurements for one file.
pub fn analyze(path: &Path, json: bool) -> Result<()> {
    info!("Analyzing: {}", path.display());

    let buffer = import_audio(path)?;
    let analysis = AudioAnalysis::analyze(&buffer);

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        println!("{}", analysis.summary());
    }

    Ok(())
}
