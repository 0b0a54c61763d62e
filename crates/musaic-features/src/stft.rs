//! Short-time Fourier transform.

use rayon::prelude::*;
use rustfft::{num_complex::Complex, FftPlanner};

/// Frames dropped from the end of every analysis.
pub const TRAILING_FRAMES: usize = 2;

/// Number of analysis frames for `len` samples.
pub fn frame_count(len: usize, hop_length: usize) -> usize {
    if hop_length == 0 {
        return 0;
    }
    (len / hop_length).saturating_sub(TRAILING_FRAMES)
}

/// Periodic Hann window of `win_length` samples, zero-padded and centered in
/// `n_fft` samples.
pub fn analysis_window(win_length: usize, n_fft: usize) -> Vec<f32> {
    let win_length = win_length.min(n_fft);
    let offset = (n_fft - win_length) / 2;
    let mut window = vec![0.0; n_fft];
    for i in 0..win_length {
        window[offset + i] =
            0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / win_length as f32).cos());
    }
    window
}

/// Power spectra of consecutive frames.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerSpectrogram {
    /// FFT size the spectra were computed with.
    pub n_fft: usize,
    /// One row of `n_fft / 2 + 1` bins per frame.
    pub frames: Vec<Vec<f32>>,
}

impl PowerSpectrogram {
    /// Computes the spectrogram of `samples`.
    ///
    /// Frame `i` is centered on sample `i * hop_length`; samples outside the
    /// buffer count as silence.
    pub fn compute(samples: &[f32], hop_length: usize, win_length: usize, n_fft: usize) -> Self {
        let count = frame_count(samples.len(), hop_length);
        let window = analysis_window(win_length, n_fft);
        let fft = FftPlanner::<f32>::new().plan_fft_forward(n_fft);
        let bins = n_fft / 2 + 1;
        let half = (n_fft / 2) as isize;

        let frames = (0..count)
            .into_par_iter()
            .map_init(
                || vec![Complex::new(0.0f32, 0.0); n_fft],
                |buffer, frame| {
                    let start = (frame * hop_length) as isize - half;
                    for (i, slot) in buffer.iter_mut().enumerate() {
                        let pos = start + i as isize;
                        let sample = if pos < 0 {
                            0.0
                        } else {
                            samples.get(pos as usize).copied().unwrap_or(0.0)
                        };
                        *slot = Complex::new(sample * window[i], 0.0);
                    }
                    fft.process(buffer);
                    buffer[..bins].iter().map(|c| c.norm_sqr()).collect()
                },
            )
            .collect();

        Self { n_fft, frames }
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns true if there are no frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Number of frequency bins per frame.
    pub fn bins(&self) -> usize {
        self.n_fft / 2 + 1
    }
}
