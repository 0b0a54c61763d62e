//! Spectral feature extraction for musaic.
//!
//! [`SpectralAnalyzer`] implements [`musaic_core::FeatureExtractor`] on top of
//! a Hann-windowed STFT computed with rustfft:
//!
//! - **timbre** - MFCCs from 128 HTK mel bands (log power, orthonormal DCT-II)
//! - **pitch** - 12 chroma bins scaled to the strongest class, plus frame RMS
//!
//! Frames are centered on multiples of the hop length. The two trailing
//! frames of every buffer are dropped, so `len` samples give
//! `len / hop - 2` frames.

pub mod analyzer;
pub mod chroma;
pub mod mel;
pub mod stft;


pub use analyzer::{SpectralAnalyzer, DEFAULT_TOP_DB};
pub use chroma::ChromaMap;
pub use mel::{Dct, MelFilterBank, MEL_BANDS};
pub use stft::{frame_count, PowerSpectrogram, TRAILING_FRAMES};
