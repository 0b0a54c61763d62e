//! Sample-level processing: normalization, resampling and channel mixing.

/// Output gain applied after peak normalization (about -3 dBFS).
pub const HEADROOM_GAIN: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// Peak absolute value of `samples`.
pub fn peak(samples: &[f32]) -> f32 {
    samples
        .iter()
        .map(|s| s.abs())
        .fold(0.0_f32, |a, b| a.max(b))
}

/// Scales `samples` so their peak absolute value equals `target_peak`.
///
/// Silent input is left untouched.
pub fn normalize_peak(samples: &mut [f32], target_peak: f32) {
    let current_peak = peak(samples);

    if current_peak > 0.0 && current_peak.is_finite() {
        let gain = target_peak / current_peak;
        for sample in samples.iter_mut() {
            *sample *= gain;
        }
    }
}

/// Linearly resamples `samples` to exactly `len` values.
///
/// The first and last input samples map onto the first and last output
/// samples.
pub fn resample_linear(samples: &[f32], len: usize) -> Vec<f32> {
    if len == 0 || samples.is_empty() {
        return Vec::new();
    }
    if samples.len() == len {
        return samples.to_vec();
    }
    if len == 1 || samples.len() == 1 {
        return vec![samples[0]; len];
    }

    let last = (samples.len() - 1) as f64;
    let step = last / (len - 1) as f64;
    (0..len)
        .map(|i| {
            let pos = i as f64 * step;
            let idx = (pos.floor() as usize).min(samples.len() - 2);
            let frac = (pos - idx as f64) as f32;
            samples[idx] + (samples[idx + 1] - samples[idx]) * frac
        })
        .collect()
}

/// Converts `samples` recorded at `from_rate` to `to_rate`.
pub fn resample_to_rate(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || from_rate == 0 {
        return samples.to_vec();
    }
    let len = (samples.len() as f64 * to_rate as f64 / from_rate as f64) as usize;
    resample_linear(samples, len)
}

/// Averages interleaved channels into a mono signal.
pub fn mix_to_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    let scale = 1.0 / channels as f32;
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() * scale)
        .collect()
}

/// Drops samples beyond `max_duration` seconds.
pub fn truncate_to_duration(samples: &mut Vec<f32>, sample_rate: u32, max_duration: Option<f64>) {
    if let Some(seconds) = max_duration {
        if seconds >= 0.0 {
            let max_len = (seconds * sample_rate as f64).round() as usize;
            samples.truncate(max_len);
        }
    }
}
