//! musaic core
//!
//! This crate implements audio musaicing (concatenative synthesis): a target
//! sound is rebuilt from short grains of a corpus of source sounds whose
//! acoustic features best match each moment of the target.
//!
//! # Overview
//!
//! - **Corpus** - source sounds analysed into feature frames and stored in a
//!   KD-tree ([`SpatialIndex`]) for approximate nearest-neighbour lookup
//! - **Mosaic** - for every frame of a target, the ranked candidate grains of
//!   one or more corpora
//! - **Synthesis** - grain selection driven by time-varying controls
//!   (fidelity, grain duration, stretch, onset variation, panning, envelope,
//!   corpus weights), followed by windowing and overlap-add
//!
//! Feature extraction and audio file decoding are pluggable: implement
//! [`FeatureExtractor`] and [`AudioLoader`].
//!
//! # Determinism
//!
//! Given the same seed, rendering produces bit-identical buffers, regardless
//! of how many threads rayon uses. All random numbers come from PCG32
//! generators whose seeds are derived via BLAKE3 hashing.
//!
//! # Example
//!
//! ```ignore
//! use musaic_core::{Corpus, CorpusSettings, EmbeddedOnly, Mosaic, SynthesisParams};
//!
//! let corpus = Corpus::build(sources, &extractor, &CorpusSettings::default())?;
//! let mosaic = Mosaic::analyze(target, &[corpus], &extractor)?;
//! let buffer = mosaic.to_audio(&SynthesisParams::default().with_seed(42), &EmbeddedOnly)?;
//! ```
//!
//! # Crate Structure
//!
//! - [`analysis`] - Analysis settings and the feature extraction seam
//! - [`audio`] - Sample buffers, resampling and source audio handles
//! - [`control`] - Time-varying control parameters and named windows
//! - [`corpus`] - Corpus construction
//! - [`index`] - The KD-tree
//! - [`mosaic`] - Target matching
//! - [`persist`] - JSON snapshots
//! - [`rng`] - Deterministic RNG with seed derivation
//! - [`synthesis`] - Grain selection and rendering

pub mod analysis;
pub mod audio;
pub mod control;
pub mod corpus;
pub mod error;
pub mod index;
pub mod mosaic;
pub mod persist;
pub mod rng;
pub mod synthesis;

// Re-export main types at crate root
pub use analysis::{AnalysisConfig, FeatureExtractor, FeatureFrame, FeatureKind, CHROMA_BINS};
pub use audio::{AudioBuffer, AudioLoader, DecodedAudio, EmbeddedOnly, SourceAudio, SourceFile};
pub use control::{ControlParameter, WindowKind};
pub use corpus::{Corpus, CorpusSettings};
pub use error::{CoreError, CoreResult, ErrorKind};
pub use index::{CorpusEntry, Neighbor, SpatialIndex};
pub use mosaic::{Candidate, CorpusId, GrainRef, Mosaic, SourceBank};
pub use persist::{Persistable, SnapshotHeader, Summary};
pub use synthesis::{CorpusWeights, GrainStatus, Render, SynthesisEngine, SynthesisParams};
