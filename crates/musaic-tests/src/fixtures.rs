//! Synthetic audio fixtures.
//!
//! Signals are generated procedurally so the tests need no audio files in
//! the repository.

use std::path::{Path, PathBuf};

use musaic_cli::audio_io::{write_wav, BitDepth};
use musaic_core::rng::create_rng;
use musaic_core::{AudioBuffer, SourceFile};
use rand::Rng;
use tempfile::TempDir;

/// Sample rate of every fixture.
pub const SAMPLE_RATE: u32 = 16000;

/// A sine tone at half amplitude.
pub fn sine(seconds: f64, freq: f32) -> Vec<f32> {
    let len = (seconds * SAMPLE_RATE as f64).round() as usize;
    (0..len)
        .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / SAMPLE_RATE as f32).sin() * 0.5)
        .collect()
}

/// A naive sawtooth at half amplitude.
pub fn sawtooth(seconds: f64, freq: f32) -> Vec<f32> {
    let len = (seconds * SAMPLE_RATE as f64).round() as usize;
    (0..len)
        .map(|i| {
            let phase = (freq * i as f32 / SAMPLE_RATE as f32).fract();
            (phase * 2.0 - 1.0) * 0.5
        })
        .collect()
}

/// Seeded white noise at quarter amplitude.
pub fn noise(seconds: f64, seed: u32) -> Vec<f32> {
    let len = (seconds * SAMPLE_RATE as f64).round() as usize;
    let mut rng = create_rng(seed);
    (0..len).map(|_| rng.gen_range(-0.25f32..0.25)).collect()
}

/// A temporary directory of WAV files.
pub struct AudioFixture {
    dir: TempDir,
}

impl AudioFixture {
    /// Creates an empty fixture directory.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Root directory of the fixture.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes mono `samples` to `name` (relative to the root) as 32-bit float.
    pub fn write(&self, name: &str, samples: &[f32]) -> PathBuf {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create fixture directory");
        }
        let buffer = AudioBuffer::from_mono(samples.to_vec(), SAMPLE_RATE);
        write_wav(&path, &buffer, BitDepth::Float32).expect("Failed to write fixture WAV");
        path
    }

    /// Writes the two standard one-second corpus sources and returns them
    /// loaded.
    pub fn corpus_sources(&self) -> Vec<SourceFile> {
        let strings = sine(1.0, 330.0);
        let buzz = sawtooth(1.0, 550.0);
        vec![
            SourceFile::loaded(self.write("sources/strings.wav", &strings), SAMPLE_RATE, strings),
            SourceFile::loaded(self.write("sources/brass/buzz.wav", &buzz), SAMPLE_RATE, buzz),
        ]
    }

    /// Writes the standard half-second target and returns it loaded.
    pub fn target(&self) -> SourceFile {
        let samples = sine(0.5, 440.0);
        SourceFile::loaded(self.write("target.wav", &samples), SAMPLE_RATE, samples)
    }
}

impl Default for AudioFixture {
    fn default() -> Self {
        Self::new()
    }
}
