//! Multi-channel output buffer.

use crate::error::{CoreError, CoreResult};

use super::processing::{mix_to_mono, peak};

/// Interleaved multi-channel audio.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Interleaved samples, `channels` values per frame.
    samples: Vec<f32>,
    /// Number of channels.
    channels: usize,
    /// Sample rate in Hz.
    sample_rate: u32,
}

impl AudioBuffer {
    /// Creates an empty buffer.
    pub fn empty(channels: usize, sample_rate: u32) -> Self {
        Self {
            samples: Vec::new(),
            channels: channels.max(1),
            sample_rate,
        }
    }

    /// Creates a silent buffer holding `num_frames` frames.
    pub fn silent(num_frames: usize, channels: usize, sample_rate: u32) -> Self {
        let channels = channels.max(1);
        Self {
            samples: vec![0.0; num_frames * channels],
            channels,
            sample_rate,
        }
    }

    /// Wraps interleaved samples.
    pub fn from_interleaved(
        samples: Vec<f32>,
        channels: usize,
        sample_rate: u32,
    ) -> CoreResult<Self> {
        if channels == 0 {
            return Err(CoreError::invalid_input("audio buffer needs at least one channel"));
        }
        if samples.len() % channels != 0 {
            return Err(CoreError::invalid_input(format!(
                "{} samples cannot be split into {} channels",
                samples.len(),
                channels
            )));
        }
        Ok(Self {
            samples,
            channels,
            sample_rate,
        })
    }

    /// Creates a single-channel buffer.
    pub fn from_mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            channels: 1,
            sample_rate,
        }
    }

    /// Number of channels.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frames (samples per channel).
    pub fn num_frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    /// Returns true if the buffer holds no frames.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds.
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.num_frames() as f64 / self.sample_rate as f64
    }

    /// Interleaved samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Mutable interleaved samples.
    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    /// Consumes the buffer, returning the interleaved samples.
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    /// Samples of frame `index`, one per channel.
    pub fn frame(&self, index: usize) -> Option<&[f32]> {
        let start = index * self.channels;
        self.samples.get(start..start + self.channels)
    }

    /// Copies out one channel.
    pub fn channel(&self, channel: usize) -> Vec<f32> {
        if channel >= self.channels {
            return Vec::new();
        }
        self.samples
            .iter()
            .skip(channel)
            .step_by(self.channels)
            .copied()
            .collect()
    }

    /// Peak absolute sample value across all channels.
    pub fn peak(&self) -> f32 {
        peak(&self.samples)
    }

    /// Sum of squared samples.
    pub fn energy(&self) -> f64 {
        self.samples.iter().map(|&s| (s as f64) * (s as f64)).sum()
    }

    /// Averages all channels into a mono signal.
    pub fn to_mono(&self) -> Vec<f32> {
        mix_to_mono(&self.samples, self.channels)
    }
}
