//! Synthesis parameters.

use serde::{Deserialize, Serialize};

use crate::control::{ControlParameter, WindowKind};
use crate::error::{CoreError, CoreResult};

/// Default grain length resolution in samples.
pub const DEFAULT_WIN_LENGTH_RES: usize = 512;

/// Default number of output channels.
pub const DEFAULT_CHANNELS: usize = 2;

/// How likely each segment is to use a corpus grain rather than the target.
///
/// In JSON, a single control (number, window name, list of values or
/// `[x, y]` pairs) is a [`Mix`](CorpusWeights::Mix). Any other list is read
/// as one control per source, target first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CorpusWeights {
    /// Probability of using any corpus; the target gets the remainder and
    /// the corpora share the corpus weight evenly.
    Mix(ControlParameter),
    /// One weight per source: the target, then every corpus in order.
    PerSource(Vec<ControlParameter>),
}

impl Default for CorpusWeights {
    fn default() -> Self {
        CorpusWeights::Mix(ControlParameter::Constant(1.0))
    }
}

/// Parameters for rendering a mosaic.
///
/// All controls except the static ones vary over the target segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SynthesisParams {
    /// Probability (0-1) of picking the best match; lower values widen the
    /// pool of candidates drawn from.
    pub fidelity: ControlParameter,
    /// Grain duration in seconds.
    pub grain_dur: ControlParameter,
    /// Time stretch of the output (2.0 plays twice as slow).
    pub stretch_factor: ControlParameter,
    /// Random grain onset variation in seconds.
    pub onset_var: ControlParameter,
    /// Contrast of the random channel panning.
    pub pan_depth: ControlParameter,
    /// Amplitude envelope applied to every grain.
    pub grain_env: ControlParameter,
    /// Target versus corpus weighting.
    pub corpus_weights: CorpusWeights,
    /// Number of output channels.
    pub n_chans: usize,
    /// Output sample rate; the target's rate when unset.
    pub sample_rate: Option<u32>,
    /// Grain lengths are multiples of this many samples.
    pub win_length_res: usize,
    /// Seed for every random decision; fresh entropy when unset.
    pub seed: Option<u32>,
}

impl Default for SynthesisParams {
    fn default() -> Self {
        Self {
            fidelity: ControlParameter::Constant(1.0),
            grain_dur: ControlParameter::Constant(0.1),
            stretch_factor: ControlParameter::Constant(1.0),
            onset_var: ControlParameter::Constant(0.0),
            pan_depth: ControlParameter::Constant(5.0),
            grain_env: ControlParameter::NamedWindow(WindowKind::Cosine),
            corpus_weights: CorpusWeights::default(),
            n_chans: DEFAULT_CHANNELS,
            sample_rate: None,
            win_length_res: DEFAULT_WIN_LENGTH_RES,
            seed: None,
        }
    }
}

impl SynthesisParams {
    /// Sets the seed.
    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Output sample rate for a target recorded at `target_rate`.
    pub fn render_rate(&self, target_rate: u32) -> u32 {
        self.sample_rate.unwrap_or(target_rate)
    }

    /// Checks static parameters and control shapes for a mosaic built from
    /// `num_corpora` corpora.
    pub fn validate(&self, num_corpora: usize) -> CoreResult<()> {
        if self.n_chans == 0 {
            return Err(CoreError::config("n_chans", "must be at least 1"));
        }
        if self.win_length_res == 0 {
            return Err(CoreError::config("win_length_res", "must be at least 1"));
        }
        if self.sample_rate == Some(0) {
            return Err(CoreError::config("sample_rate", "must be greater than 0"));
        }

        let controls = [
            ("fidelity", &self.fidelity),
            ("grain_dur", &self.grain_dur),
            ("stretch_factor", &self.stretch_factor),
            ("onset_var", &self.onset_var),
            ("pan_depth", &self.pan_depth),
            ("grain_env", &self.grain_env),
        ];
        for (name, control) in controls {
            control.validate().map_err(|e| rename(e, name))?;
        }

        match &self.corpus_weights {
            CorpusWeights::Mix(control) => {
                control.validate().map_err(|e| rename(e, "corpus_weights"))
            }
            CorpusWeights::PerSource(controls) => {
                if controls.len() != num_corpora + 1 {
                    return Err(CoreError::config(
                        "corpus_weights",
                        format!(
                            "expected {} entries (the target, then {} corpora), found {}",
                            num_corpora + 1,
                            num_corpora,
                            controls.len()
                        ),
                    ));
                }
                for control in controls {
                    control.validate().map_err(|e| rename(e, "corpus_weights"))?;
                }
                Ok(())
            }
        }
    }
}

// attach the parameter name to generic control errors
fn rename(error: CoreError, name: &str) -> CoreError {
    match error {
        CoreError::Configuration { message, .. } => CoreError::config(name, message),
        other => other,
    }
}
