//! Summarize command implementation
//!
//! Prints an overview of a corpus or mosaic snapshot.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use musaic_core::{Corpus, Mosaic, Persistable, SnapshotHeader, Summary};
use std::fs;
use std::process::ExitCode;

use super::reporting;

/// Run the summarize command
///
/// # Arguments
/// * `file` - Corpus or mosaic snapshot
///
/// # Returns
/// Exit code: 0 on success
pub fn run(file: &str) -> Result<ExitCode> {
    let json = fs::read_to_string(file).with_context(|| format!("Failed to read: {}", file))?;
    let summary = summarize_json(&json).with_context(|| format!("Invalid snapshot: {}", file))?;

    println!("{} {}", "File:".dimmed(), file);
    reporting::print_summary(&summary);
    Ok(ExitCode::SUCCESS)
}

/// Summarizes a snapshot of either kind.
pub fn summarize_json(json: &str) -> Result<Summary> {
    let header = SnapshotHeader::peek(json)?;
    match header.kind.as_deref() {
        Some(kind) if kind == Corpus::KIND => Ok(Corpus::from_json(json)?.summarize()),
        Some(kind) if kind == Mosaic::KIND => Ok(Mosaic::from_json(json)?.summarize()),
        Some(other) => bail!("unknown snapshot kind '{}'", other),
        None => bail!("not a musaic snapshot"),
    }
}
