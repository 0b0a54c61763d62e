//! Corpus command implementation
//!
//! Analyzes source sounds and writes a corpus snapshot.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use musaic_core::{AnalysisConfig, Corpus, CorpusSettings, FeatureKind, Persistable};
use musaic_features::SpectralAnalyzer;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing::warn;
use walkdir::WalkDir;

use super::reporting;
use crate::audio_io::read_source;

/// Options of the corpus command; unset values keep the defaults.
#[derive(Debug, Clone, Default)]
pub struct CorpusOptions {
    pub leaf_size: Option<usize>,
    pub max_duration: Option<f64>,
    pub features: Vec<String>,
    pub n_mfcc: Option<usize>,
    pub hop_length: Option<usize>,
    pub portable: bool,
    pub seed: Option<u32>,
}

impl CorpusOptions {
    /// Corpus settings with these options applied.
    pub fn settings(&self) -> Result<CorpusSettings> {
        let mut analysis = AnalysisConfig::default();
        if !self.features.is_empty() {
            analysis.features = self
                .features
                .iter()
                .map(|name| FeatureKind::from_name(name))
                .collect::<Result<_, _>>()?;
        }
        if let Some(n_mfcc) = self.n_mfcc {
            analysis.n_mfcc = n_mfcc;
        }
        if let Some(hop_length) = self.hop_length {
            analysis.hop_length = hop_length;
        }
        analysis.validate()?;

        let mut settings = CorpusSettings {
            max_duration: self.max_duration,
            seed: self.seed,
            analysis,
            ..Default::default()
        };
        if let Some(leaf_size) = self.leaf_size {
            settings.leaf_size = leaf_size;
        }
        Ok(settings)
    }
}

/// Run the corpus command
///
/// # Arguments
/// * `paths` - WAV files or directories to search for WAV files
/// * `output` - Path of the corpus snapshot to write
/// * `options` - Analysis and index options
///
/// # Returns
/// Exit code: 0 on success
pub fn run(paths: &[String], output: &str, options: &CorpusOptions) -> Result<ExitCode> {
    let start = Instant::now();
    let settings = options.settings()?;

    let files = collect_wav_files(paths)?;
    if files.is_empty() {
        bail!("no .wav files found in: {}", paths.join(", "));
    }
    println!(
        "{} {} source file(s)",
        "Analyzing:".cyan().bold(),
        files.len()
    );

    let sources = files
        .iter()
        .map(|path| {
            read_source(path, settings.max_duration)
                .with_context(|| format!("Failed to read source: {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let corpus = Corpus::build(sources, &SpectralAnalyzer::new(), &settings)
        .context("Failed to build corpus")?;
    corpus
        .write_json(Path::new(output), options.portable)
        .with_context(|| format!("Failed to write corpus: {}", output))?;

    reporting::print_summary(&corpus.summarize());
    println!(
        "{} {} corpus {} ({})",
        "Wrote".green().bold(),
        if options.portable { "portable" } else { "non-portable" },
        output,
        reporting::elapsed(start)
    );
    Ok(ExitCode::SUCCESS)
}

/// Expands `paths` into absolute WAV file paths.
///
/// Directories are searched recursively in file name order. Files whose
/// name (without extension) was already collected are skipped.
pub fn collect_wav_files(paths: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut seen = BTreeSet::new();

    for path in paths {
        let root = fs::canonicalize(path).with_context(|| format!("No such file: {}", path))?;
        let candidates: Vec<PathBuf> = if root.is_dir() {
            WalkDir::new(&root)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path())
                .filter(|p| is_wav(p))
                .collect()
        } else {
            vec![root]
        };

        for file in candidates {
            let stem = file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            if seen.insert(stem) {
                files.push(file);
            } else {
                warn!(path = %file.display(), "skipping source with a duplicate file name");
            }
        }
    }
    Ok(files)
}

fn is_wav(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("wav"))
        .unwrap_or(false)
}
