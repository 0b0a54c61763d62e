//! Analysis configuration and the feature extraction seam.
//!
//! The core never looks at raw spectra. It consumes [`FeatureFrame`]s that a
//! [`FeatureExtractor`] produces from mono sample buffers, and it records the
//! [`AnalysisConfig`] that produced them so a target can later be analysed
//! the same way as the corpus it is matched against.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Number of chroma bins produced by pitch analysis.
pub const CHROMA_BINS: usize = 12;

/// Kind of acoustic feature extracted per analysis frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    /// Mel-frequency cepstral coefficients.
    Timbre,
    /// Chroma energy plus frame loudness (RMS).
    Pitch,
}

impl FeatureKind {
    /// Number of vector components this kind contributes.
    pub fn dims(&self, config: &AnalysisConfig) -> usize {
        match self {
            FeatureKind::Timbre => config.n_mfcc,
            FeatureKind::Pitch => CHROMA_BINS + 1,
        }
    }

    /// Parses a feature kind name.
    pub fn from_name(name: &str) -> CoreResult<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "timbre" => Ok(FeatureKind::Timbre),
            "pitch" => Ok(FeatureKind::Pitch),
            other => Err(CoreError::config(
                "features",
                format!("unknown feature kind '{}' (expected timbre or pitch)", other),
            )),
        }
    }

    /// Returns the canonical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureKind::Timbre => "timbre",
            FeatureKind::Pitch => "pitch",
        }
    }
}

/// Analysis parameters shared by corpora and mosaics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Number of cepstral coefficients for timbre analysis.
    pub n_mfcc: usize,
    /// Distance between analysis frames in samples.
    pub hop_length: usize,
    /// Analysis window length in samples.
    pub win_length: usize,
    /// FFT size in samples.
    pub n_fft: usize,
    /// Feature kinds, concatenated in this order.
    pub features: Vec<FeatureKind>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            n_mfcc: 13,
            hop_length: 512,
            win_length: 1024,
            n_fft: 1024,
            features: vec![FeatureKind::Timbre],
        }
    }
}

impl AnalysisConfig {
    /// Dimensionality of the feature vectors this configuration produces.
    pub fn dims(&self) -> usize {
        self.features.iter().map(|f| f.dims(self)).sum()
    }

    /// Returns true when both configurations produce comparable vectors.
    pub fn is_compatible(&self, other: &AnalysisConfig) -> bool {
        self.features == other.features && self.dims() == other.dims()
    }

    /// Checks the configuration for unusable values.
    pub fn validate(&self) -> CoreResult<()> {
        if self.hop_length == 0 {
            return Err(CoreError::config("hop_length", "must be greater than 0"));
        }
        if self.n_fft == 0 || self.win_length == 0 {
            return Err(CoreError::config("n_fft", "FFT and window sizes must be greater than 0"));
        }
        if self.win_length > self.n_fft {
            return Err(CoreError::config(
                "win_length",
                format!(
                    "window length {} exceeds FFT size {}",
                    self.win_length, self.n_fft
                ),
            ));
        }
        if self.features.is_empty() {
            return Err(CoreError::config(
                "features",
                "at least one feature kind is required",
            ));
        }
        for (i, kind) in self.features.iter().enumerate() {
            if self.features[..i].contains(kind) {
                return Err(CoreError::config(
                    "features",
                    format!("feature kind '{}' listed twice", kind.as_str()),
                ));
            }
        }
        if self.features.contains(&FeatureKind::Timbre) && self.n_mfcc == 0 {
            return Err(CoreError::config("n_mfcc", "must be greater than 0"));
        }
        Ok(())
    }
}

/// One analysis frame: where it starts and what it sounds like.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    /// Sample offset of the frame at the analysed buffer's native rate.
    pub marker: u64,
    /// Feature vector.
    pub vector: Vec<f64>,
}

impl FeatureFrame {
    /// Creates a new frame.
    pub fn new(marker: u64, vector: Vec<f64>) -> Self {
        Self { marker, vector }
    }
}

/// Turns a mono sample buffer into per-frame feature vectors.
///
/// Implementations must return vectors of [`AnalysisConfig::dims`] components
/// for every frame, with markers spaced `hop_length` samples apart.
pub trait FeatureExtractor: Sync {
    /// Analyses `samples` recorded at `sample_rate`.
    fn analyze(
        &self,
        samples: &[f32],
        sample_rate: u32,
        config: &AnalysisConfig,
    ) -> CoreResult<Vec<FeatureFrame>>;
}
