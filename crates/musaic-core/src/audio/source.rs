//! Source audio handles and the loader seam for deferred sources.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{CoreError, CoreResult};

use super::processing::{resample_to_rate, truncate_to_duration};

/// Mono audio decoded by an [`AudioLoader`].
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Mono samples.
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

/// Loads mono audio for sources whose samples were not embedded.
pub trait AudioLoader: Sync {
    /// Loads `path`, reading at most `max_duration` seconds.
    ///
    /// A file that does not exist must be reported as
    /// [`CoreError::ResourceMissing`].
    fn load(&self, path: &Path, max_duration: Option<f64>) -> CoreResult<DecodedAudio>;
}

/// Loader for fully embedded corpora and mosaics; every lookup fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedOnly;

impl AudioLoader for EmbeddedOnly {
    fn load(&self, path: &Path, _max_duration: Option<f64>) -> CoreResult<DecodedAudio> {
        Err(CoreError::missing(path))
    }
}

/// Samples of a source file, either in memory or to be loaded on use.
#[derive(Debug, Clone)]
pub enum SourceAudio {
    /// Samples at the source's native rate.
    Loaded(Arc<[f32]>),
    /// Samples must be loaded from disk before rendering.
    Deferred,
}

impl SourceAudio {
    /// Returns true if samples are in memory.
    pub fn is_loaded(&self) -> bool {
        matches!(self, SourceAudio::Loaded(_))
    }
}

/// One source sound file of a corpus (or the target of a mosaic).
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path, relative to the owning corpus's source root.
    pub path: PathBuf,
    /// Native sample rate in Hz.
    pub sample_rate: u32,
    /// Sample data.
    pub audio: SourceAudio,
}

impl SourceFile {
    /// Creates a source with samples in memory.
    pub fn loaded(path: impl Into<PathBuf>, sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            path: path.into(),
            sample_rate,
            audio: SourceAudio::Loaded(samples.into()),
        }
    }

    /// Creates a source whose samples are loaded on use.
    pub fn deferred(path: impl Into<PathBuf>, sample_rate: u32) -> Self {
        Self {
            path: path.into(),
            sample_rate,
            audio: SourceAudio::Deferred,
        }
    }

    /// Samples if they are in memory.
    pub fn samples(&self) -> Option<&Arc<[f32]>> {
        match &self.audio {
            SourceAudio::Loaded(samples) => Some(samples),
            SourceAudio::Deferred => None,
        }
    }

    /// Drops in-memory samples beyond `max_duration` seconds.
    pub fn truncated(mut self, max_duration: Option<f64>) -> Self {
        if max_duration.is_none() {
            return self;
        }
        if let SourceAudio::Loaded(samples) = &self.audio {
            let mut owned = samples.to_vec();
            truncate_to_duration(&mut owned, self.sample_rate, max_duration);
            if owned.len() < samples.len() {
                self.audio = SourceAudio::Loaded(owned.into());
            }
        }
        self
    }

    /// A copy of the source with its samples in memory, loading them
    /// through `loader` if they are deferred.
    pub fn embedded(
        &self,
        root: &Path,
        max_duration: Option<f64>,
        loader: &dyn AudioLoader,
    ) -> CoreResult<Self> {
        Ok(Self {
            path: self.path.clone(),
            sample_rate: self.sample_rate,
            audio: SourceAudio::Loaded(self.resolve(root, max_duration, loader)?),
        })
    }

    /// Returns the samples at the native rate, loading them if needed.
    pub fn resolve(
        &self,
        root: &Path,
        max_duration: Option<f64>,
        loader: &dyn AudioLoader,
    ) -> CoreResult<Arc<[f32]>> {
        match &self.audio {
            SourceAudio::Loaded(samples) => Ok(Arc::clone(samples)),
            SourceAudio::Deferred => {
                let path = root.join(&self.path);
                let decoded = loader.load(&path, max_duration)?;
                let mut samples = if decoded.sample_rate == self.sample_rate {
                    decoded.samples
                } else {
                    resample_to_rate(&decoded.samples, decoded.sample_rate, self.sample_rate)
                };
                truncate_to_duration(&mut samples, self.sample_rate, max_duration);
                Ok(samples.into())
            }
        }
    }
}
