//! Per-segment control tables.
//!
//! Every control is resolved once per render into a table with one entry per
//! target segment, so the grain loop only does lookups.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;

use crate::control::ControlParameter;
use crate::error::CoreResult;

use super::params::CorpusWeights;

/// Weights over `{target, corpus 0, .., corpus m}` per segment.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightTable {
    /// One row per segment; every row sums to 1.
    pub rows: Vec<Vec<f64>>,
    /// True when corpora were weighted individually.
    pub per_source: bool,
}

impl WeightTable {
    /// Returns true if any segment can play the target.
    pub fn uses_target(&self) -> bool {
        self.rows.iter().any(|row| row[0] > 0.0)
    }
}

/// Builds the corpus weight table.
///
/// Values are clamped to `[0, 1]` before each row is normalized. A row
/// without any weight goes entirely to the target.
pub fn corpus_weight_table(
    weights: &CorpusWeights,
    n: usize,
    num_corpora: usize,
) -> CoreResult<WeightTable> {
    let (columns, per_source) = match weights {
        CorpusWeights::Mix(control) => {
            let wet = control.resolve_clamped(n, 0.0, 1.0)?;
            let dry: Vec<f64> = wet.iter().map(|w| 1.0 - w).collect();
            let mut columns = vec![dry];
            columns.extend(std::iter::repeat(wet).take(num_corpora));
            (columns, false)
        }
        CorpusWeights::PerSource(controls) => (
            controls
                .iter()
                .map(|control| control.resolve_clamped(n, 0.0, 1.0))
                .collect::<CoreResult<Vec<_>>>()?,
            true,
        ),
    };

    let rows = (0..n)
        .map(|i| {
            let mut row: Vec<f64> = columns.iter().map(|column| column[i]).collect();
            let total: f64 = row.iter().sum();
            if total > 0.0 {
                row.iter_mut().for_each(|w| *w /= total);
            } else {
                row.iter_mut().for_each(|w| *w = 0.0);
                row[0] = 1.0;
            }
            row
        })
        .collect();
    Ok(WeightTable { rows, per_source })
}

/// Grain lengths in samples, rounded to multiples of `res`.
pub fn win_length_table(
    grain_dur: &ControlParameter,
    n: usize,
    sample_rate: u32,
    res: usize,
) -> CoreResult<Vec<usize>> {
    Ok(grain_dur
        .resolve(n)?
        .into_iter()
        .map(|seconds| {
            let samples = seconds.max(0.0) * sample_rate as f64;
            (samples / res as f64).round() as usize * res
        })
        .collect())
}

/// Output onsets in samples.
///
/// Onsets advance by the stretched hop length, starting at 0, and are then
/// jittered by up to a quarter of `onset_var` seconds each way (never
/// below 0).
pub fn onset_table<R: Rng>(
    stretch_factor: &ControlParameter,
    onset_var: &ControlParameter,
    n: usize,
    hop_length: usize,
    sample_rate: u32,
    rng: &mut R,
) -> CoreResult<Vec<usize>> {
    let stretch = stretch_factor.resolve(n)?;
    let variation = onset_var.resolve(n)?;
    let half_rate = (sample_rate / 2) as f64;

    let mut onsets = Vec::with_capacity(n);
    let mut position: i64 = 0;
    for (factor, var) in stretch.iter().zip(&variation) {
        let jitter = ((rng.gen::<f64>() - 0.5) * var * half_rate) as i64;
        onsets.push((position + jitter).max(0) as usize);
        position += (factor.max(0.0) * hop_length as f64).round() as i64;
    }
    Ok(onsets)
}

/// Channel gains per segment.
///
/// Channels sit evenly spaced on `[0, 1]`. Each segment draws a random pan
/// position; a channel's gain halves for every `1 / pan_depth` of distance
/// from it, and the gains of a segment sum to 1.
pub fn pan_table<R: Rng>(
    pan_depth: &ControlParameter,
    n: usize,
    channels: usize,
    rng: &mut R,
) -> CoreResult<Vec<Vec<f32>>> {
    let depth = pan_depth.resolve(n)?;
    let positions = crate::control::linspace(0.0, 1.0, channels);
    Ok(depth
        .iter()
        .map(|d| {
            let pan: f64 = rng.gen();
            let gains: Vec<f64> = positions
                .iter()
                .map(|p| 1.0 / 2f64.powf(d * (p - pan).abs()))
                .collect();
            let total: f64 = gains.iter().sum();
            gains.iter().map(|g| (g / total) as f32).collect()
        })
        .collect())
}

/// Grain envelopes for the grain lengths a render places.
#[derive(Debug, Clone, Default)]
pub struct WindowBank {
    windows: BTreeMap<usize, Vec<f32>>,
}

impl WindowBank {
    /// Renders `envelope` once for every distinct non-zero length.
    pub fn new(
        envelope: &ControlParameter,
        lengths: impl IntoIterator<Item = usize>,
    ) -> CoreResult<Self> {
        let lengths: BTreeSet<usize> = lengths.into_iter().filter(|&len| len > 0).collect();
        let windows = lengths
            .into_iter()
            .map(|len| {
                let window = envelope.resolve(len)?;
                Ok((len, window.into_iter().map(|v| v as f32).collect()))
            })
            .collect::<CoreResult<_>>()?;
        Ok(Self { windows })
    }

    /// The envelope of `len` samples, if it was rendered.
    pub fn get(&self, len: usize) -> Option<&[f32]> {
        self.windows.get(&len).map(Vec::as_slice)
    }

    /// Number of stored envelopes.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// Returns true if no envelope is stored.
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

/// Every table a render needs.
#[derive(Debug, Clone)]
pub struct ControlTables {
    /// Target and corpus weights.
    pub weights: WeightTable,
    /// Grain length per segment.
    pub win_lengths: Vec<usize>,
    /// Output onset per segment.
    pub onsets: Vec<usize>,
    /// Channel gains per segment.
    pub pans: Vec<Vec<f32>>,
    /// Fidelity per segment, within `[0, 1]`.
    pub fidelity: Vec<f64>,
}

impl ControlTables {
    /// Output length in frames: the last onset plus the longest grain.
    pub fn output_len(&self) -> usize {
        let last_onset = self.onsets.iter().copied().max().unwrap_or(0);
        let longest = self.win_lengths.iter().copied().max().unwrap_or(0);
        last_onset + longest
    }
}
