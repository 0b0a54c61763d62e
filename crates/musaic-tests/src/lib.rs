//! musaic End-to-End Test Infrastructure
//!
//! This crate provides integration tests for the full pipeline:
//!
//! - Analysis: WAV sources -> corpus -> mosaic
//! - Rendering: mosaic + parameters -> audio
//! - **Determinism**: identical output for identical seeds
//! - Persistence: portable and non-portable snapshots
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p musaic-tests
//! ```

pub mod determinism;
pub mod fixtures;

pub use determinism::{buffer_hash, verify_determinism, DeterminismResult};
pub use fixtures::{noise, sawtooth, sine, AudioFixture, SAMPLE_RATE};
