//! Mel filter bank and cepstral coefficients.

/// Number of mel bands MFCCs are computed from.
pub const MEL_BANDS: usize = 128;

/// Floor applied to band energies before taking logarithms.
pub const POWER_FLOOR: f32 = 1e-10;

/// Converts a frequency in Hz to the HTK mel scale.
pub fn hz_to_mel(hz: f64) -> f64 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

/// Converts an HTK mel value back to Hz.
pub fn mel_to_hz(mel: f64) -> f64 {
    700.0 * (10f64.powf(mel / 2595.0) - 1.0)
}

/// Converts power to decibels.
pub fn power_to_db(power: f32) -> f32 {
    10.0 * power.max(POWER_FLOOR).log10()
}

/// Triangular, area-normalized filters spanning 0 Hz to Nyquist.
#[derive(Debug, Clone)]
pub struct MelFilterBank {
    filters: Vec<Vec<f32>>,
}

impl MelFilterBank {
    /// Builds `bands` filters over the `n_fft / 2 + 1` bins of a spectrum.
    pub fn new(sample_rate: u32, n_fft: usize, bands: usize) -> Self {
        let bins = n_fft / 2 + 1;
        let nyquist = sample_rate as f64 / 2.0;
        let top = hz_to_mel(nyquist);
        let edges: Vec<f64> = (0..bands + 2)
            .map(|i| mel_to_hz(top * i as f64 / (bands + 1) as f64))
            .collect();
        let bin_hz: Vec<f64> = (0..bins)
            .map(|k| k as f64 * sample_rate as f64 / n_fft as f64)
            .collect();

        let filters = (0..bands)
            .map(|band| {
                let (lower, center, upper) = (edges[band], edges[band + 1], edges[band + 2]);
                let scale = 2.0 / (upper - lower);
                bin_hz
                    .iter()
                    .map(|&f| {
                        let rising = (f - lower) / (center - lower);
                        let falling = (upper - f) / (upper - center);
                        (rising.min(falling).max(0.0) * scale) as f32
                    })
                    .collect()
            })
            .collect();

        Self { filters }
    }

    /// Number of bands.
    pub fn bands(&self) -> usize {
        self.filters.len()
    }

    /// Weights of one band.
    pub fn filter(&self, band: usize) -> Option<&[f32]> {
        self.filters.get(band).map(Vec::as_slice)
    }

    /// Band energies of a power spectrum.
    pub fn apply(&self, power: &[f32]) -> Vec<f32> {
        self.filters
            .iter()
            .map(|weights| weights.iter().zip(power).map(|(w, p)| w * p).sum())
            .collect()
    }
}

/// Orthonormal DCT-II, truncated to the first coefficients.
#[derive(Debug, Clone)]
pub struct Dct {
    basis: Vec<Vec<f32>>,
}

impl Dct {
    /// Builds the first `coefficients` rows for inputs of length `len`.
    pub fn new(len: usize, coefficients: usize) -> Self {
        let n = len as f64;
        let basis = (0..coefficients)
            .map(|k| {
                let scale = if k == 0 {
                    (1.0 / n).sqrt()
                } else {
                    (2.0 / n).sqrt()
                };
                (0..len)
                    .map(|i| {
                        let angle =
                            std::f64::consts::PI * k as f64 * (2 * i + 1) as f64 / (2.0 * n);
                        (scale * angle.cos()) as f32
                    })
                    .collect()
            })
            .collect();
        Self { basis }
    }

    /// Transforms `input`.
    pub fn apply(&self, input: &[f32]) -> Vec<f64> {
        self.basis
            .iter()
            .map(|row| {
                row.iter()
                    .zip(input)
                    .map(|(b, x)| (*b as f64) * (*x as f64))
                    .sum()
            })
            .collect()
    }
}
