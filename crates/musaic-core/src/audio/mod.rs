//! Audio buffers, sample processing and source audio handles.
//!
//! Decoding and encoding audio files is left to callers: they plug in through
//! the [`AudioLoader`] trait and consume [`AudioBuffer`]s.

mod buffer;
mod processing;
mod source;

#[cfg(test)]
mod tests_buffer;
#[cfg(test)]
mod tests_processing;

// Re-export public API
pub use buffer::AudioBuffer;
pub use processing::{
    mix_to_mono, normalize_peak, peak, resample_linear, resample_to_rate, truncate_to_duration,
    HEADROOM_GAIN,
};
pub use source::{AudioLoader, DecodedAudio, EmbeddedOnly, SourceAudio, SourceFile};
