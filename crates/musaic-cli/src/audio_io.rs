//! WAV file decoding and encoding with hound.

use std::io;
use std::path::Path;

use musaic_core::audio::mix_to_mono;
use musaic_core::{AudioBuffer, AudioLoader, CoreError, CoreResult, DecodedAudio, SourceFile};

/// Sample format of written WAV files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum BitDepth {
    /// 16-bit integer PCM.
    #[value(name = "16")]
    Int16,
    /// 24-bit integer PCM.
    #[value(name = "24")]
    #[default]
    Int24,
    /// 32-bit IEEE float.
    #[value(name = "32f")]
    Float32,
}

impl BitDepth {
    fn spec(&self, channels: u16, sample_rate: u32) -> hound::WavSpec {
        let (bits_per_sample, sample_format) = match self {
            BitDepth::Int16 => (16, hound::SampleFormat::Int),
            BitDepth::Int24 => (24, hound::SampleFormat::Int),
            BitDepth::Float32 => (32, hound::SampleFormat::Float),
        };
        hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample,
            sample_format,
        }
    }
}

/// Loads deferred sources from WAV files on disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct WavLoader;

impl AudioLoader for WavLoader {
    fn load(&self, path: &Path, max_duration: Option<f64>) -> CoreResult<DecodedAudio> {
        read_wav(path, max_duration)
    }
}

/// Reads a WAV file and mixes it down to mono.
///
/// Reads at most `max_duration` seconds. A file that does not exist is a
/// [`CoreError::ResourceMissing`].
pub fn read_wav(path: &Path, max_duration: Option<f64>) -> CoreResult<DecodedAudio> {
    let mut reader = hound::WavReader::open(path).map_err(|e| wav_error(path, e))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;
    let limit = match max_duration {
        Some(seconds) if seconds >= 0.0 => {
            (seconds * spec.sample_rate as f64).round() as usize * channels
        }
        _ => usize::MAX,
    };

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .take(limit)
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(|e| wav_error(path, e))?
        }
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .take(limit)
            .collect::<Result<_, _>>()
            .map_err(|e| wav_error(path, e))?,
    };

    Ok(DecodedAudio {
        samples: mix_to_mono(&interleaved, channels),
        sample_rate: spec.sample_rate,
    })
}

/// Reads a WAV file into an in-memory source.
pub fn read_source(path: &Path, max_duration: Option<f64>) -> CoreResult<SourceFile> {
    let decoded = read_wav(path, max_duration)?;
    Ok(SourceFile::loaded(path, decoded.sample_rate, decoded.samples))
}

/// Writes `buffer` as a WAV file.
///
/// Integer formats clip samples to [-1, 1].
pub fn write_wav(path: &Path, buffer: &AudioBuffer, depth: BitDepth) -> CoreResult<()> {
    let channels = u16::try_from(buffer.channels()).map_err(|_| {
        CoreError::invalid_input(format!("cannot write {} channels", buffer.channels()))
    })?;
    let spec = depth.spec(channels, buffer.sample_rate());
    let mut writer = hound::WavWriter::create(path, spec).map_err(|e| wav_error(path, e))?;

    match depth {
        BitDepth::Float32 => {
            for &sample in buffer.samples() {
                writer.write_sample(sample).map_err(|e| wav_error(path, e))?;
            }
        }
        BitDepth::Int16 => {
            for &sample in buffer.samples() {
                let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
                writer.write_sample(value).map_err(|e| wav_error(path, e))?;
            }
        }
        BitDepth::Int24 => {
            const MAX_24: f32 = 8_388_607.0;
            for &sample in buffer.samples() {
                let value = (sample.clamp(-1.0, 1.0) * MAX_24).round() as i32;
                writer.write_sample(value).map_err(|e| wav_error(path, e))?;
            }
        }
    }
    writer.finalize().map_err(|e| wav_error(path, e))
}

fn wav_error(path: &Path, err: hound::Error) -> CoreError {
    match err {
        hound::Error::IoError(e) if e.kind() == io::ErrorKind::NotFound => CoreError::missing(path),
        hound::Error::IoError(e) => CoreError::Io(e),
        other => CoreError::invalid_input(format!("{}: {}", path.display(), other)),
    }
}
