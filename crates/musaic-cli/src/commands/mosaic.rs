//! Mosaic command implementation
//!
//! Matches a target sound against one or more corpus snapshots.

use anyhow::{Context, Result};
use colored::Colorize;
use musaic_core::{Corpus, Mosaic, Persistable};
use musaic_features::SpectralAnalyzer;
use std::fs;
use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

use super::reporting;
use crate::audio_io::{read_source, WavLoader};

/// Run the mosaic command
///
/// # Arguments
/// * `target` - Target WAV file
/// * `corpora` - Corpus snapshot files
/// * `output` - Path of the mosaic snapshot to write
/// * `portable` - Whether to embed source samples
///
/// # Returns
/// Exit code: 0 on success
pub fn run(target: &str, corpora: &[String], output: &str, portable: bool) -> Result<ExitCode> {
    let start = Instant::now();

    let corpora = corpora
        .iter()
        .map(|path| {
            println!("{} {}", "Reading corpus:".cyan().bold(), path);
            Corpus::read_json(Path::new(path))
                .with_context(|| format!("Failed to read corpus: {}", path))
        })
        .collect::<Result<Vec<_>>>()?;

    let target_path =
        fs::canonicalize(target).with_context(|| format!("No such file: {}", target))?;
    let target = read_source(&target_path, None)
        .with_context(|| format!("Failed to read target: {}", target_path.display()))?;

    println!("{} {}", "Matching:".cyan().bold(), target_path.display());
    let mut mosaic = Mosaic::analyze(target, &corpora, &SpectralAnalyzer::new())
        .context("Failed to build mosaic")?;
    if portable {
        mosaic = mosaic
            .embedded(&WavLoader)
            .context("Failed to load corpus audio for a portable mosaic")?;
    }
    mosaic
        .write_json(Path::new(output), portable)
        .with_context(|| format!("Failed to write mosaic: {}", output))?;

    reporting::print_summary(&mosaic.summarize());
    println!(
        "{} {} mosaic {} ({})",
        "Wrote".green().bold(),
        if portable { "portable" } else { "non-portable" },
        output,
        reporting::elapsed(start)
    );
    Ok(ExitCode::SUCCESS)
}
