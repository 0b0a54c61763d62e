//! Mosaics: ranked corpus matches for every frame of a target sound.
//!
//! A [`Mosaic`] is the blueprint of a musaic. It stores, per target frame,
//! the candidate grains of every corpus sorted by feature distance, plus the
//! source files those candidates point into. Turning it into audio is the
//! job of [`SynthesisEngine`](crate::synthesis::SynthesisEngine), so one
//! mosaic can be rendered many times with different parameters.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::{AnalysisConfig, FeatureExtractor, FeatureFrame, FeatureKind};
use crate::audio::{AudioBuffer, AudioLoader, SourceFile};
use crate::corpus::{feature_list, Corpus};
use crate::error::{CoreError, CoreResult};
use crate::persist::{Persistable, SourceSnapshot, Summary, SNAPSHOT_VERSION};
use crate::synthesis::{SynthesisEngine, SynthesisParams};

/// Identifies where a grain comes from.
///
/// Serialized as `-1` for the target and as the corpus position otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum CorpusId {
    /// The mosaic's own target sound.
    Target,
    /// The corpus at this position in the list the mosaic was built from.
    Corpus(usize),
}

impl From<CorpusId> for i64 {
    fn from(id: CorpusId) -> Self {
        match id {
            CorpusId::Target => -1,
            CorpusId::Corpus(i) => i as i64,
        }
    }
}

impl TryFrom<i64> for CorpusId {
    type Error = CoreError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(CorpusId::Target),
            v if v >= 0 => Ok(CorpusId::Corpus(v as usize)),
            v => Err(CoreError::invalid_input(format!("invalid corpus id {}", v))),
        }
    }
}

impl fmt::Display for CorpusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorpusId::Target => f.write_str("target"),
            CorpusId::Corpus(i) => write!(f, "corpus {}", i),
        }
    }
}

/// A grain location: a source file and a sample offset into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GrainRef {
    /// Owning corpus, or the target.
    pub corpus_id: CorpusId,
    /// Source file within the corpus.
    pub source_id: usize,
    /// Sample offset at the source's native rate.
    pub marker: u64,
}

impl GrainRef {
    /// Creates a new grain reference.
    pub fn new(corpus_id: CorpusId, source_id: usize, marker: u64) -> Self {
        Self {
            corpus_id,
            source_id,
            marker,
        }
    }

    /// The grain of the target itself at `marker`.
    pub fn passthrough(marker: u64) -> Self {
        Self::new(CorpusId::Target, 0, marker)
    }
}

/// A candidate grain for one target frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Where the grain lives.
    #[serde(flatten)]
    pub grain: GrainRef,
    /// Distance to the target frame in normalized feature space.
    pub cost: f64,
}

/// The source files of one corpus (or of the target) that a mosaic uses.
#[derive(Debug, Clone)]
pub struct SourceBank {
    /// Owner of the files.
    pub corpus_id: CorpusId,
    /// Directory that file paths are relative to.
    pub source_root: PathBuf,
    /// Duration limit applied when deferred files are loaded.
    pub max_duration: Option<f64>,
    /// Files by source id.
    pub files: BTreeMap<usize, SourceFile>,
}

impl SourceBank {
    /// Full path of a file in the bank.
    pub fn path(&self, source_id: usize) -> Option<PathBuf> {
        self.files
            .get(&source_id)
            .map(|file| self.source_root.join(&file.path))
    }
}

/// Ranked corpus matches for every frame of a target.
#[derive(Debug, Clone)]
pub struct Mosaic {
    target_path: PathBuf,
    target_sample_rate: u32,
    hop_length: usize,
    config: AnalysisConfig,
    duration: Option<f64>,
    frames: Vec<Vec<Candidate>>,
    banks: Vec<SourceBank>,
}

impl Mosaic {
    /// Analyses `target` like the first corpus and matches it against all
    /// `corpora`.
    pub fn analyze(
        target: SourceFile,
        corpora: &[Corpus],
        extractor: &dyn FeatureExtractor,
    ) -> CoreResult<Self> {
        let first = corpora
            .first()
            .ok_or_else(|| CoreError::invalid_input("a mosaic needs at least one corpus"))?;
        let config = first.config().clone();
        let samples = target.samples().ok_or_else(|| {
            CoreError::invalid_input(format!(
                "target '{}' has no samples to analyse",
                target.path.display()
            ))
        })?;
        info!(target = %target.path.display(), "analysing target");
        let frames = extractor.analyze(samples, target.sample_rate, &config)?;
        Self::build(target, frames, corpora, &config)
    }

    /// Matches target `frames` against every corpus.
    ///
    /// For every frame each corpus contributes up to its leaf size of
    /// nearest grains; the merged list is sorted by cost, ties keeping corpus
    /// order.
    ///
    /// # Errors
    /// * `InvalidInput` if `corpora` is empty or the corpora were analysed
    ///   with different feature kinds
    /// * `DimensionMismatch` if frame and corpus vectors differ in length
    pub fn build(
        target: SourceFile,
        frames: Vec<FeatureFrame>,
        corpora: &[Corpus],
        config: &AnalysisConfig,
    ) -> CoreResult<Self> {
        validate_corpora(corpora, config)?;
        if target.sample_rate == 0 {
            return Err(CoreError::invalid_input("target sample rate is 0"));
        }
        for frame in &frames {
            if frame.vector.len() != config.dims() {
                return Err(CoreError::DimensionMismatch {
                    expected: config.dims(),
                    found: frame.vector.len(),
                });
            }
        }

        info!(
            frames = frames.len(),
            corpora = corpora.len(),
            "matching target frames"
        );
        let matched = frames
            .par_iter()
            .map(|frame| match_frame(&frame.vector, corpora))
            .collect::<CoreResult<Vec<_>>>()?;

        let duration = target
            .samples()
            .map(|samples| samples.len() as f64 / target.sample_rate as f64);
        let banks = collect_banks(&target, corpora, &matched);

        Ok(Self {
            target_path: target.path,
            target_sample_rate: target.sample_rate,
            hop_length: config.hop_length,
            config: config.clone(),
            duration,
            frames: matched,
            banks,
        })
    }

    /// Path of the target sound.
    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    /// Native sample rate of the target.
    pub fn target_sample_rate(&self) -> u32 {
        self.target_sample_rate
    }

    /// Distance between target frames in target samples.
    pub fn hop_length(&self) -> usize {
        self.hop_length
    }

    /// Analysis parameters shared with the corpora.
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Feature kinds used for matching.
    pub fn features(&self) -> &[FeatureKind] {
        &self.config.features
    }

    /// Target duration in seconds, when the target audio was available.
    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    /// Candidate lists, one per target frame.
    pub fn frames(&self) -> &[Vec<Candidate>] {
        &self.frames
    }

    /// Number of target frames (output segments).
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    /// Number of corpora the mosaic was built from.
    pub fn num_corpora(&self) -> usize {
        self.banks.len() - 1
    }

    /// All source banks; the target bank comes first.
    pub fn banks(&self) -> &[SourceBank] {
        &self.banks
    }

    /// The bank of `corpus_id`.
    pub fn bank(&self, corpus_id: CorpusId) -> Option<&SourceBank> {
        let position = match corpus_id {
            CorpusId::Target => 0,
            CorpusId::Corpus(i) => i.checked_add(1)?,
        };
        self.banks.get(position)
    }

    /// The source file a grain points into.
    pub fn source(&self, grain: &GrainRef) -> Option<&SourceFile> {
        self.bank(grain.corpus_id)?.files.get(&grain.source_id)
    }

    /// A copy of the mosaic with every source, the target included, in
    /// memory, so it can be written as a portable snapshot. Deferred
    /// sources are loaded through `loader`.
    ///
    /// # Errors
    /// `ResourceMissing` if a source file no longer exists.
    pub fn embedded(&self, loader: &dyn AudioLoader) -> CoreResult<Self> {
        let deferred = self
            .banks
            .iter()
            .flat_map(|bank| bank.files.values())
            .filter(|file| !file.audio.is_loaded())
            .count();
        if deferred > 0 {
            info!(sources = deferred, "embedding mosaic sources");
        }
        let banks = self
            .banks
            .iter()
            .map(|bank| {
                let files = bank
                    .files
                    .iter()
                    .map(|(&id, file)| {
                        Ok((id, file.embedded(&bank.source_root, bank.max_duration, loader)?))
                    })
                    .collect::<CoreResult<_>>()?;
                Ok(SourceBank {
                    corpus_id: bank.corpus_id,
                    source_root: bank.source_root.clone(),
                    max_duration: bank.max_duration,
                    files,
                })
            })
            .collect::<CoreResult<Vec<_>>>()?;
        let duration = self.duration.or_else(|| {
            banks
                .first()
                .and_then(|bank| bank.files.get(&0))
                .and_then(SourceFile::samples)
                .map(|samples| samples.len() as f64 / self.target_sample_rate as f64)
        });
        Ok(Self {
            target_path: self.target_path.clone(),
            target_sample_rate: self.target_sample_rate,
            hop_length: self.hop_length,
            config: self.config.clone(),
            duration,
            frames: self.frames.clone(),
            banks,
        })
    }

    /// Renders the mosaic with `params`.
    ///
    /// Deferred sources are loaded through `loader`.
    pub fn to_audio(
        &self,
        params: &SynthesisParams,
        loader: &dyn AudioLoader,
    ) -> CoreResult<AudioBuffer> {
        Ok(SynthesisEngine::new(self, params)?.render(loader)?.buffer)
    }
}

fn validate_corpora(corpora: &[Corpus], config: &AnalysisConfig) -> CoreResult<()> {
    config.validate()?;
    let first = corpora
        .first()
        .ok_or_else(|| CoreError::invalid_input("a mosaic needs at least one corpus"))?;
    for (i, corpus) in corpora.iter().enumerate() {
        if corpus.features() != first.features() {
            return Err(CoreError::invalid_input(format!(
                "corpus {} uses features [{}] but corpus 0 uses [{}]",
                i,
                feature_list(corpus.features()),
                feature_list(first.features())
            )));
        }
        if corpus.dims() != config.dims() {
            return Err(CoreError::DimensionMismatch {
                expected: config.dims(),
                found: corpus.dims(),
            });
        }
    }
    if first.features() != config.features.as_slice() {
        return Err(CoreError::invalid_input(format!(
            "target features [{}] differ from corpus features [{}]",
            feature_list(&config.features),
            feature_list(first.features())
        )));
    }
    Ok(())
}

fn match_frame(vector: &[f64], corpora: &[Corpus]) -> CoreResult<Vec<Candidate>> {
    let mut candidates = Vec::new();
    for (corpus_id, corpus) in corpora.iter().enumerate() {
        for neighbor in corpus.query(vector)? {
            candidates.push(Candidate {
                grain: GrainRef::new(
                    CorpusId::Corpus(corpus_id),
                    neighbor.source_id,
                    neighbor.marker,
                ),
                cost: neighbor.cost,
            });
        }
    }
    candidates.sort_by(|a, b| a.cost.total_cmp(&b.cost));
    Ok(candidates)
}

/// Copies the referenced sources of every corpus, plus the target itself.
fn collect_banks(
    target: &SourceFile,
    corpora: &[Corpus],
    frames: &[Vec<Candidate>],
) -> Vec<SourceBank> {
    let referenced: BTreeSet<(usize, usize)> = frames
        .iter()
        .flatten()
        .filter_map(|candidate| match candidate.grain.corpus_id {
            CorpusId::Corpus(c) => Some((c, candidate.grain.source_id)),
            CorpusId::Target => None,
        })
        .collect();

    let mut banks = Vec::with_capacity(corpora.len() + 1);
    banks.push(SourceBank {
        corpus_id: CorpusId::Target,
        source_root: PathBuf::new(),
        max_duration: None,
        files: BTreeMap::from([(0, target.clone())]),
    });
    for (corpus_id, corpus) in corpora.iter().enumerate() {
        let files = referenced
            .range((corpus_id, 0)..=(corpus_id, usize::MAX))
            .filter_map(|&(_, source_id)| {
                corpus
                    .source(source_id)
                    .map(|source| (source_id, source.clone()))
            })
            .collect();
        banks.push(SourceBank {
            corpus_id: CorpusId::Corpus(corpus_id),
            source_root: corpus.source_root().to_path_buf(),
            max_duration: corpus.max_duration(),
            files,
        });
    }
    banks
}

/// Persisted form of a [`SourceBank`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceBankSnapshot {
    /// Owner of the files.
    pub corpus_id: CorpusId,
    /// Directory that file paths are relative to.
    pub source_root: PathBuf,
    /// Duration limit applied when deferred files are loaded.
    pub max_duration: Option<f64>,
    /// Files by source id.
    pub files: BTreeMap<usize, SourceSnapshot>,
}

/// Persisted form of a [`Mosaic`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MosaicSnapshot {
    /// Always `"mosaic"`.
    pub kind: String,
    /// Snapshot format version.
    pub version: u32,
    /// Whether source samples are embedded.
    pub portable: bool,
    /// Path of the target sound.
    pub target_path: PathBuf,
    /// Native sample rate of the target.
    pub target_sample_rate: u32,
    /// Distance between target frames in target samples.
    pub hop_length: usize,
    /// Analysis parameters.
    pub config: AnalysisConfig,
    /// Target duration in seconds.
    pub duration: Option<f64>,
    /// Candidate lists per target frame.
    pub frames: Vec<Vec<Candidate>>,
    /// Source banks, target first.
    pub sources: Vec<SourceBankSnapshot>,
}

impl Persistable for Mosaic {
    type Snapshot = MosaicSnapshot;

    const KIND: &'static str = "mosaic";

    fn serialize(&self, portable: bool) -> CoreResult<MosaicSnapshot> {
        let sources = self
            .banks
            .iter()
            .map(|bank| {
                Ok(SourceBankSnapshot {
                    corpus_id: bank.corpus_id,
                    source_root: bank.source_root.clone(),
                    max_duration: bank.max_duration,
                    files: bank
                        .files
                        .iter()
                        .map(|(&id, file)| Ok((id, SourceSnapshot::capture(file, portable)?)))
                        .collect::<CoreResult<_>>()?,
                })
            })
            .collect::<CoreResult<_>>()?;
        Ok(MosaicSnapshot {
            kind: Self::KIND.to_string(),
            version: SNAPSHOT_VERSION,
            portable,
            target_path: self.target_path.clone(),
            target_sample_rate: self.target_sample_rate,
            hop_length: self.hop_length,
            config: self.config.clone(),
            duration: self.duration,
            frames: self.frames.clone(),
            sources,
        })
    }

    fn preload(snapshot: MosaicSnapshot) -> CoreResult<Self> {
        snapshot.config.validate()?;
        if snapshot.target_sample_rate == 0 {
            return Err(CoreError::invalid_input("target sample rate is 0"));
        }
        if snapshot.hop_length != snapshot.config.hop_length {
            return Err(CoreError::invalid_input(format!(
                "hop length {} does not match the analysis hop length {}",
                snapshot.hop_length, snapshot.config.hop_length
            )));
        }

        let mut banks = Vec::with_capacity(snapshot.sources.len());
        for (position, bank) in snapshot.sources.into_iter().enumerate() {
            let expected = match position {
                0 => CorpusId::Target,
                p => CorpusId::Corpus(p - 1),
            };
            if bank.corpus_id != expected {
                return Err(CoreError::invalid_input(format!(
                    "source bank {} belongs to {}, expected {}",
                    position, bank.corpus_id, expected
                )));
            }
            let files = bank
                .files
                .into_iter()
                .map(|(id, file)| Ok((id, file.restore()?)))
                .collect::<CoreResult<BTreeMap<_, _>>>()?;
            banks.push(SourceBank {
                corpus_id: bank.corpus_id,
                source_root: bank.source_root,
                max_duration: bank.max_duration,
                files,
            });
        }
        if banks.len() < 2 || !banks[0].files.contains_key(&0) {
            return Err(CoreError::invalid_input(
                "mosaic must hold the target and at least one corpus",
            ));
        }

        let mosaic = Self {
            target_path: snapshot.target_path,
            target_sample_rate: snapshot.target_sample_rate,
            hop_length: snapshot.hop_length,
            config: snapshot.config,
            duration: snapshot.duration,
            frames: snapshot.frames,
            banks,
        };
        for (n, frame) in mosaic.frames.iter().enumerate() {
            for candidate in frame {
                if mosaic.source(&candidate.grain).is_none() {
                    return Err(CoreError::invalid_input(format!(
                        "frame {} refers to missing source {} of {}",
                        n, candidate.grain.source_id, candidate.grain.corpus_id
                    )));
                }
            }
        }
        Ok(mosaic)
    }

    fn summarize(&self) -> Summary {
        let target = self
            .target_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.target_path.display().to_string());
        let embedded = self
            .banks
            .iter()
            .flat_map(|bank| bank.files.values())
            .all(|file| file.audio.is_loaded());
        Summary::new(Self::KIND)
            .field("target", target)
            .field("num. of corpora", self.num_corpora())
            .field("analysis features", feature_list(self.features()))
            .field("audio", if embedded { "embedded" } else { "deferred" })
            .field(
                "duration",
                self.duration
                    .map(|d| format!("{:.1}s", d))
                    .unwrap_or_else(|| "unknown".to_string()),
            )
            .field("num. of grains", self.num_frames())
    }
}
