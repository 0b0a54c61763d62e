//! The spectral [`FeatureExtractor`].

use musaic_core::{
    AnalysisConfig, CoreError, CoreResult, FeatureExtractor, FeatureFrame, FeatureKind,
};
use tracing::debug;

use crate::chroma::{spectral_rms, ChromaMap};
use crate::mel::{power_to_db, Dct, MelFilterBank, MEL_BANDS};
use crate::stft::PowerSpectrogram;

/// Default dynamic range kept below the loudest mel band, in dB.
pub const DEFAULT_TOP_DB: f32 = 80.0;

/// STFT based extractor for timbre (MFCC) and pitch (chroma + RMS) features.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralAnalyzer {
    /// Mel band levels more than this many dB below the loudest band of the
    /// whole buffer are raised to that floor. `None` keeps the full range.
    pub top_db: Option<f32>,
}

impl Default for SpectralAnalyzer {
    fn default() -> Self {
        Self {
            top_db: Some(DEFAULT_TOP_DB),
        }
    }
}

impl SpectralAnalyzer {
    /// Creates an analyzer with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// MFCCs per frame.
    pub fn timbre(
        &self,
        spectrogram: &PowerSpectrogram,
        sample_rate: u32,
        n_mfcc: usize,
    ) -> Vec<Vec<f64>> {
        let bank = MelFilterBank::new(sample_rate, spectrogram.n_fft, MEL_BANDS);
        let mut levels: Vec<Vec<f32>> = spectrogram
            .frames
            .iter()
            .map(|power| bank.apply(power).into_iter().map(power_to_db).collect())
            .collect();

        if let Some(top_db) = self.top_db {
            let loudest = levels
                .iter()
                .flatten()
                .copied()
                .fold(f32::NEG_INFINITY, f32::max);
            let floor = loudest - top_db;
            for level in levels.iter_mut().flatten() {
                *level = level.max(floor);
            }
        }

        let dct = Dct::new(bank.bands(), n_mfcc);
        levels.iter().map(|frame| dct.apply(frame)).collect()
    }

    /// Chroma followed by RMS per frame.
    pub fn pitch(
        &self,
        spectrogram: &PowerSpectrogram,
        sample_rate: u32,
        win_length: usize,
    ) -> Vec<Vec<f64>> {
        let map = ChromaMap::new(sample_rate, spectrogram.n_fft);
        spectrogram
            .frames
            .iter()
            .map(|power| {
                let mut vector = map.apply(power).to_vec();
                vector.push(spectral_rms(power, spectrogram.n_fft, win_length));
                vector
            })
            .collect()
    }
}

impl FeatureExtractor for SpectralAnalyzer {
    fn analyze(
        &self,
        samples: &[f32],
        sample_rate: u32,
        config: &AnalysisConfig,
    ) -> CoreResult<Vec<FeatureFrame>> {
        config.validate()?;
        if sample_rate == 0 {
            return Err(CoreError::invalid_input("cannot analyse audio at 0 Hz"));
        }

        let spectrogram =
            PowerSpectrogram::compute(samples, config.hop_length, config.win_length, config.n_fft);
        let mut vectors = vec![Vec::with_capacity(config.dims()); spectrogram.len()];
        for kind in &config.features {
            let part = match kind {
                FeatureKind::Timbre => self.timbre(&spectrogram, sample_rate, config.n_mfcc),
                FeatureKind::Pitch => self.pitch(&spectrogram, sample_rate, config.win_length),
            };
            for (vector, values) in vectors.iter_mut().zip(part) {
                vector.extend(values);
            }
        }

        debug!(
            samples = samples.len(),
            frames = vectors.len(),
            dims = config.dims(),
            "extracted features"
        );
        Ok(vectors
            .into_iter()
            .enumerate()
            .map(|(i, vector)| FeatureFrame::new((i * config.hop_length) as u64, vector))
            .collect())
    }
}
