//! Pitch class energy and loudness.

use musaic_core::CHROMA_BINS;

/// Lowest frequency assigned to a pitch class.
pub const MIN_CHROMA_HZ: f64 = 27.5;

/// Maps spectrum bins onto the twelve pitch classes, C first.
#[derive(Debug, Clone)]
pub struct ChromaMap {
    classes: Vec<Option<usize>>,
}

impl ChromaMap {
    /// Builds the bin mapping for an `n_fft` point spectrum.
    pub fn new(sample_rate: u32, n_fft: usize) -> Self {
        let classes = (0..n_fft / 2 + 1)
            .map(|k| {
                let hz = k as f64 * sample_rate as f64 / n_fft as f64;
                if hz < MIN_CHROMA_HZ {
                    return None;
                }
                let midi = 69.0 + 12.0 * (hz / 440.0).log2();
                Some((midi.round() as i64).rem_euclid(CHROMA_BINS as i64) as usize)
            })
            .collect();
        Self { classes }
    }

    /// Pitch class of a bin, if it has one.
    pub fn class(&self, bin: usize) -> Option<usize> {
        self.classes.get(bin).copied().flatten()
    }

    /// Magnitude per pitch class, scaled so the strongest class is 1.
    ///
    /// A silent frame yields all zeros.
    pub fn apply(&self, power: &[f32]) -> [f64; CHROMA_BINS] {
        let mut chroma = [0.0; CHROMA_BINS];
        for (class, p) in self.classes.iter().zip(power) {
            if let Some(class) = class {
                chroma[*class] += (*p as f64).sqrt();
            }
        }
        let max = chroma.iter().copied().fold(0.0, f64::max);
        if max > 0.0 {
            for value in &mut chroma {
                *value /= max;
            }
        }
        chroma
    }
}

/// Root mean square of a windowed frame, from its one-sided power spectrum.
pub fn spectral_rms(power: &[f32], n_fft: usize, frame_length: usize) -> f64 {
    if power.is_empty() || frame_length == 0 {
        return 0.0;
    }
    let last = power.len() - 1;
    let total: f64 = power
        .iter()
        .enumerate()
        .map(|(k, &p)| {
            let p = p as f64;
            if k == 0 || (k == last && n_fft % 2 == 0) {
                p * 0.5
            } else {
                p
            }
        })
        .sum();
    (2.0 * total / (frame_length as f64).powi(2)).sqrt()
}
