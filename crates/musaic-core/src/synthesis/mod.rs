//! Concatenative synthesis.
//!
//! [`SynthesisEngine`] turns a [`Mosaic`](crate::mosaic::Mosaic) into audio:
//! every target segment gets one grain, chosen either from the segment's
//! ranked corpus candidates or from the target itself, which is then
//! windowed, panned across the output channels and overlap-added at the
//! segment's onset.
//!
//! Every random decision is seeded. Segments draw from their own generator
//! derived from the base seed, so rendering in parallel produces the same
//! buffer as rendering in order.

mod engine;
mod params;
mod tables;

#[cfg(test)]
mod tests_engine;
#[cfg(test)]
mod tests_tables;

pub use engine::{GrainReport, GrainStatus, Render, SynthesisEngine};
pub use params::{CorpusWeights, SynthesisParams, DEFAULT_CHANNELS, DEFAULT_WIN_LENGTH_RES};
pub use tables::{
    corpus_weight_table, onset_table, pan_table, win_length_table, ControlTables, WeightTable,
    WindowBank,
};
