//! Error types for the musaic core.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Broad classification of a [`CoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad input data at construction or read time.
    InvalidInput,
    /// Bad synthesis or analysis parameters.
    Configuration,
    /// A deferred source could not be found when it was needed.
    ResourceMissing,
    /// Underlying I/O or (de)serialization failure.
    Io,
}

/// Errors that can occur while building corpora, mosaics, or audio.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Input data is unusable (empty corpus, no sources, corrupt snapshot).
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Error message.
        message: String,
    },

    /// Feature vectors of different dimensionality were combined.
    #[error("feature dimensionality mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Dimensionality of the index or corpus.
        expected: usize,
        /// Dimensionality that was supplied.
        found: usize,
    },

    /// Invalid parameter value.
    #[error("invalid parameter '{name}': {message}")]
    Configuration {
        /// Parameter name.
        name: String,
        /// Error message.
        message: String,
    },

    /// A referenced source file is not available.
    #[error("missing source audio: {}", path.display())]
    ResourceMissing {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    /// Creates an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates a missing resource error.
    pub fn missing(path: impl Into<PathBuf>) -> Self {
        Self::ResourceMissing { path: path.into() }
    }

    /// Returns the broad classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::InvalidInput { .. } | CoreError::DimensionMismatch { .. } => {
                ErrorKind::InvalidInput
            }
            CoreError::Configuration { .. } => ErrorKind::Configuration,
            CoreError::ResourceMissing { .. } => ErrorKind::ResourceMissing,
            CoreError::Io(_) | CoreError::Serialization(_) => ErrorKind::Io,
        }
    }

    /// Returns a stable error code for diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::InvalidInput { .. } => "MUSAIC_001",
            CoreError::DimensionMismatch { .. } => "MUSAIC_002",
            CoreError::Configuration { .. } => "MUSAIC_003",
            CoreError::ResourceMissing { .. } => "MUSAIC_004",
            CoreError::Io(_) => "MUSAIC_005",
            CoreError::Serialization(_) => "MUSAIC_006",
        }
    }
}
