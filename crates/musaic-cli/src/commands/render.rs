//! Render command implementation
//!
//! Renders a mosaic snapshot to a WAV file.

use anyhow::{Context, Result};
use colored::Colorize;
use musaic_core::{
    ControlParameter, CorpusWeights, GrainStatus, Mosaic, Persistable, SynthesisEngine,
    SynthesisParams,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

use super::reporting;
use crate::audio_io::{write_wav, BitDepth, WavLoader};

/// Options of the render command.
///
/// Control flags take a number, a window name, or a JSON control such as
/// `[1, 0.5]` or `[[0, 1], [10, 0]]`. They override the parameter file.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub params: Option<String>,
    pub fidelity: Option<String>,
    pub grain_dur: Option<String>,
    pub stretch: Option<String>,
    pub onset_var: Option<String>,
    pub pan_depth: Option<String>,
    pub envelope: Option<String>,
    pub corpus_weight: Option<String>,
    pub channels: Option<usize>,
    pub sample_rate: Option<u32>,
    pub seed: Option<u32>,
    pub bit_depth: BitDepth,
}

impl RenderOptions {
    /// Synthesis parameters from the parameter file and flag overrides.
    pub fn synthesis_params(&self) -> Result<SynthesisParams> {
        let mut params = match &self.params {
            Some(path) => {
                let json = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read parameter file: {}", path))?;
                serde_json::from_str(&json)
                    .with_context(|| format!("Invalid parameter file: {}", path))?
            }
            None => SynthesisParams::default(),
        };

        let controls: [(&str, &Option<String>, &mut ControlParameter); 6] = [
            ("fidelity", &self.fidelity, &mut params.fidelity),
            ("grain-dur", &self.grain_dur, &mut params.grain_dur),
            ("stretch", &self.stretch, &mut params.stretch_factor),
            ("onset-var", &self.onset_var, &mut params.onset_var),
            ("pan-depth", &self.pan_depth, &mut params.pan_depth),
            ("envelope", &self.envelope, &mut params.grain_env),
        ];
        for (flag, value, slot) in controls {
            if let Some(value) = value {
                *slot = parse_flag(flag, value)?;
            }
        }
        if let Some(value) = &self.corpus_weight {
            params.corpus_weights = parse_flag::<CorpusWeights>("corpus-weight", value)?;
        }
        if let Some(channels) = self.channels {
            params.n_chans = channels;
        }
        if self.sample_rate.is_some() {
            params.sample_rate = self.sample_rate;
        }
        if self.seed.is_some() {
            params.seed = self.seed;
        }
        Ok(params)
    }
}

/// Run the render command
///
/// # Arguments
/// * `mosaic` - Mosaic snapshot to render
/// * `output` - Output WAV file
/// * `options` - Synthesis parameters and output format
///
/// # Returns
/// Exit code: 0 on success
pub fn run(mosaic: &str, output: &str, options: &RenderOptions) -> Result<ExitCode> {
    let start = Instant::now();
    let params = options.synthesis_params()?;

    println!("{} {}", "Rendering:".cyan().bold(), mosaic);
    let mosaic = Mosaic::read_json(Path::new(mosaic))
        .with_context(|| format!("Failed to read mosaic: {}", mosaic))?;
    let engine = SynthesisEngine::new(&mosaic, &params).context("Invalid synthesis parameters")?;
    let render = engine.render(&WavLoader).context("Failed to render mosaic")?;

    let skipped = render
        .grains
        .iter()
        .filter(|r| r.status != GrainStatus::Rendered)
        .count();
    println!(
        "  {} grains ({} from the target, {} skipped), seed {}",
        render.rendered(),
        render.passthrough(),
        skipped,
        render.seed
    );

    write_wav(Path::new(output), &render.buffer, options.bit_depth)
        .with_context(|| format!("Failed to write: {}", output))?;
    println!(
        "{} {} ({:.2}s of audio, {} ch, {} Hz) ({})",
        "Wrote".green().bold(),
        output,
        render.buffer.duration_seconds(),
        render.buffer.channels(),
        render.buffer.sample_rate(),
        reporting::elapsed(start)
    );
    Ok(ExitCode::SUCCESS)
}

/// Parses a flag value as JSON, falling back to a bare string.
fn parse_flag<T: DeserializeOwned>(flag: &str, value: &str) -> Result<T> {
    let json = serde_json::from_str::<Value>(value)
        .unwrap_or_else(|_| Value::String(value.trim().to_string()));
    serde_json::from_value(json).with_context(|| format!("Invalid value for --{}: {}", flag, value))
}
