//! Corpora: analysed collections of source sounds.

use std::path::{Component, Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::{AnalysisConfig, FeatureExtractor, FeatureFrame, FeatureKind};
use crate::audio::{AudioLoader, SourceFile};
use crate::error::{CoreError, CoreResult};
use crate::index::{CorpusEntry, Neighbor, SpatialIndex, DEFAULT_LEAF_SIZE};
use crate::persist::{Persistable, SourceSnapshot, Summary, SNAPSHOT_VERSION};
use crate::rng::{create_component_rng, resolve_seed};

/// Settings for building a [`Corpus`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorpusSettings {
    /// Maximum number of frames per index leaf, and the number of candidates
    /// each target frame draws from this corpus.
    pub leaf_size: usize,
    /// Sources are truncated to this many seconds before analysis.
    pub max_duration: Option<f64>,
    /// Seed for the index build; fresh entropy when unset.
    pub seed: Option<u32>,
    /// Analysis parameters.
    pub analysis: AnalysisConfig,
}

impl Default for CorpusSettings {
    fn default() -> Self {
        Self {
            leaf_size: DEFAULT_LEAF_SIZE,
            max_duration: None,
            seed: None,
            analysis: AnalysisConfig::default(),
        }
    }
}

/// A set of analysed source sounds and the index over their frames.
#[derive(Debug, Clone)]
pub struct Corpus {
    config: AnalysisConfig,
    source_root: PathBuf,
    max_duration: Option<f64>,
    sources: Vec<SourceFile>,
    index: SpatialIndex,
}

impl Corpus {
    /// Analyses `sources` with `extractor` and indexes every frame.
    ///
    /// Sources must have their samples in memory. They are analysed in
    /// parallel with `settings.analysis`.
    ///
    /// # Errors
    /// * `InvalidInput` if there are no sources, a source has no samples, or
    ///   the analysis produced no frames
    /// * `Configuration` if the analysis settings are unusable
    pub fn build(
        sources: Vec<SourceFile>,
        extractor: &dyn FeatureExtractor,
        settings: &CorpusSettings,
    ) -> CoreResult<Self> {
        settings.analysis.validate()?;
        if sources.is_empty() {
            return Err(CoreError::invalid_input("corpus has no source files"));
        }

        let sources: Vec<SourceFile> = sources
            .into_iter()
            .map(|source| source.truncated(settings.max_duration))
            .collect();

        info!(sources = sources.len(), "analysing corpus sources");
        let frames = sources
            .par_iter()
            .map(|source| {
                let samples = source.samples().ok_or_else(|| {
                    CoreError::invalid_input(format!(
                        "source '{}' has no samples to analyse",
                        source.path.display()
                    ))
                })?;
                extractor.analyze(samples, source.sample_rate, &settings.analysis)
            })
            .collect::<CoreResult<Vec<_>>>()?;

        Self::from_frames(sources, frames, settings)
    }

    /// Builds a corpus from frames computed elsewhere.
    ///
    /// `frames[i]` holds the frames of `sources[i]`.
    pub fn from_frames(
        sources: Vec<SourceFile>,
        frames: Vec<Vec<FeatureFrame>>,
        settings: &CorpusSettings,
    ) -> CoreResult<Self> {
        settings.analysis.validate()?;
        if sources.is_empty() {
            return Err(CoreError::invalid_input("corpus has no source files"));
        }
        if sources.len() != frames.len() {
            return Err(CoreError::invalid_input(format!(
                "{} sources but {} frame lists",
                sources.len(),
                frames.len()
            )));
        }

        let dims = settings.analysis.dims();
        let mut entries = Vec::with_capacity(frames.iter().map(Vec::len).sum());
        for (source_id, source_frames) in frames.into_iter().enumerate() {
            for frame in source_frames {
                if frame.vector.len() != dims {
                    return Err(CoreError::DimensionMismatch {
                        expected: dims,
                        found: frame.vector.len(),
                    });
                }
                entries.push(CorpusEntry::new(source_id, frame.marker, frame.vector));
            }
        }
        if let Some(source) = sources.iter().find(|s| s.sample_rate == 0) {
            return Err(CoreError::invalid_input(format!(
                "source '{}' has a sample rate of 0",
                source.path.display()
            )));
        }
        if entries.is_empty() {
            return Err(CoreError::invalid_input(
                "corpus sources are too short to produce any analysis frames",
            ));
        }

        let seed = resolve_seed(settings.seed);
        let mut rng = create_component_rng(seed, "index");
        let index = SpatialIndex::build(entries, settings.leaf_size, &mut rng)?;

        let sources = sources
            .into_iter()
            .map(|source| source.truncated(settings.max_duration))
            .collect();
        let (source_root, sources) = relativize(sources);
        info!(
            sources = sources.len(),
            frames = index.len(),
            root = %source_root.display(),
            "built corpus"
        );
        Ok(Self {
            config: settings.analysis.clone(),
            source_root,
            max_duration: settings.max_duration,
            sources,
            index,
        })
    }

    /// Analysis parameters the corpus was built with.
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Feature kinds of the stored vectors.
    pub fn features(&self) -> &[FeatureKind] {
        &self.config.features
    }

    /// Directory that source paths are relative to.
    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    /// Per-source duration limit in seconds.
    pub fn max_duration(&self) -> Option<f64> {
        self.max_duration
    }

    /// Source files, indexed by source id.
    pub fn sources(&self) -> &[SourceFile] {
        &self.sources
    }

    /// The source with `source_id`.
    pub fn source(&self, source_id: usize) -> Option<&SourceFile> {
        self.sources.get(source_id)
    }

    /// Full path of a source.
    pub fn source_path(&self, source_id: usize) -> Option<PathBuf> {
        self.source(source_id)
            .map(|source| self.source_root.join(&source.path))
    }

    /// The frame index.
    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    /// Maximum number of frames per index leaf.
    pub fn leaf_size(&self) -> usize {
        self.index.leaf_size()
    }

    /// Dimensionality of the stored feature vectors.
    pub fn dims(&self) -> usize {
        self.index.dims()
    }

    /// Total number of analysis frames.
    pub fn num_frames(&self) -> usize {
        self.index.len()
    }

    /// A copy of the corpus with every source in memory, so it can be
    /// written as a portable snapshot. Deferred sources are loaded through
    /// `loader`.
    ///
    /// # Errors
    /// `ResourceMissing` if a source file no longer exists.
    pub fn embedded(&self, loader: &dyn AudioLoader) -> CoreResult<Self> {
        let deferred = self.sources.iter().filter(|s| !s.audio.is_loaded()).count();
        if deferred > 0 {
            info!(sources = deferred, "embedding corpus sources");
        }
        let sources = self
            .sources
            .iter()
            .map(|source| source.embedded(&self.source_root, self.max_duration, loader))
            .collect::<CoreResult<_>>()?;
        Ok(Self {
            config: self.config.clone(),
            source_root: self.source_root.clone(),
            max_duration: self.max_duration,
            sources,
            index: self.index.clone(),
        })
    }

    /// Returns the best `leaf_size` matches for a raw feature vector.
    pub fn query(&self, vector: &[f64]) -> CoreResult<Vec<Neighbor>> {
        self.index.knn(vector, self.leaf_size())
    }
}

/// Moves the common directory of all source paths into a separate root.
///
/// A lone source keeps its full path and an empty root.
fn relativize(sources: Vec<SourceFile>) -> (PathBuf, Vec<SourceFile>) {
    let root = common_root(&sources);
    if root.as_os_str().is_empty() {
        return (root, sources);
    }

    let sources = sources
        .into_iter()
        .map(|mut source| {
            if let Ok(relative) = source.path.strip_prefix(&root) {
                source.path = relative.to_path_buf();
            }
            source
        })
        .collect();
    (root, sources)
}

fn common_root(sources: &[SourceFile]) -> PathBuf {
    if sources.len() < 2 {
        return PathBuf::new();
    }
    let mut common: Vec<Component> = sources[0].path.components().collect();
    for source in &sources[1..] {
        let shared = common
            .iter()
            .zip(source.path.components())
            .take_while(|(a, b)| **a == *b)
            .count();
        common.truncate(shared);
    }
    // the root is a directory, never one of the files
    if sources
        .iter()
        .any(|s| s.path.components().count() == common.len())
    {
        common.pop();
    }
    common.iter().collect()
}

/// Persisted form of a [`Corpus`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorpusSnapshot {
    /// Always `"corpus"`.
    pub kind: String,
    /// Snapshot format version.
    pub version: u32,
    /// Whether source samples are embedded.
    pub portable: bool,
    /// Analysis parameters.
    pub config: AnalysisConfig,
    /// Directory that source paths are relative to.
    pub source_root: PathBuf,
    /// Per-source duration limit in seconds.
    pub max_duration: Option<f64>,
    /// Maximum number of frames per leaf.
    pub leaf_size: usize,
    /// Source files.
    pub sources: Vec<SourceSnapshot>,
    /// The normalized frame index.
    pub index: SpatialIndex,
}

impl Persistable for Corpus {
    type Snapshot = CorpusSnapshot;

    const KIND: &'static str = "corpus";

    fn serialize(&self, portable: bool) -> CoreResult<CorpusSnapshot> {
        Ok(CorpusSnapshot {
            kind: Self::KIND.to_string(),
            version: SNAPSHOT_VERSION,
            portable,
            config: self.config.clone(),
            source_root: self.source_root.clone(),
            max_duration: self.max_duration,
            leaf_size: self.leaf_size(),
            sources: self
                .sources
                .iter()
                .map(|source| SourceSnapshot::capture(source, portable))
                .collect::<CoreResult<_>>()?,
            index: self.index.clone(),
        })
    }

    fn preload(snapshot: CorpusSnapshot) -> CoreResult<Self> {
        snapshot.config.validate()?;
        snapshot.index.validate()?;
        if snapshot.leaf_size != snapshot.index.leaf_size() {
            return Err(CoreError::invalid_input(format!(
                "leaf size {} does not match the index leaf size {}",
                snapshot.leaf_size,
                snapshot.index.leaf_size()
            )));
        }
        if snapshot.index.dims() != snapshot.config.dims() {
            return Err(CoreError::DimensionMismatch {
                expected: snapshot.config.dims(),
                found: snapshot.index.dims(),
            });
        }
        if let Some(entry) = snapshot
            .index
            .entries()
            .iter()
            .find(|entry| entry.source_id >= snapshot.sources.len())
        {
            return Err(CoreError::invalid_input(format!(
                "index refers to source {} but the corpus has {} sources",
                entry.source_id,
                snapshot.sources.len()
            )));
        }

        let sources = snapshot
            .sources
            .into_iter()
            .map(SourceSnapshot::restore)
            .collect::<CoreResult<Vec<_>>>()?;
        Ok(Self {
            config: snapshot.config,
            source_root: snapshot.source_root,
            max_duration: snapshot.max_duration,
            sources,
            index: snapshot.index,
        })
    }

    fn summarize(&self) -> Summary {
        let names: Vec<String> = self
            .sources
            .iter()
            .map(|source| {
                source
                    .path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| source.path.display().to_string())
            })
            .collect();
        let embedded = self.sources.iter().all(|s| s.audio.is_loaded());
        Summary::new(Self::KIND)
            .field("source root", self.source_root.display())
            .field("audio", if embedded { "embedded" } else { "deferred" })
            .field(
                "max. duration per source",
                self.max_duration
                    .map(|d| format!("{}s", d))
                    .unwrap_or_else(|| "none".to_string()),
            )
            .field("max. tree leaf size", self.leaf_size())
            .field("analysis features", feature_list(&self.config.features))
            .field("frames", self.num_frames())
            .field(format!("sources ({})", self.sources.len()), names.join(", "))
    }
}

pub(crate) fn feature_list(features: &[FeatureKind]) -> String {
    features
        .iter()
        .map(FeatureKind::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
