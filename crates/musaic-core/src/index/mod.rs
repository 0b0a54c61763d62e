//! Feature-space grain index.
//!
//! [`SpatialIndex`] is a KD-tree stored as a flat arena of [`Node`]s. Leaves
//! own contiguous ranges of a single entry array, so a built index is two
//! vectors and a pair of per-axis normalization tables.
//!
//! Every stored vector and every split threshold is rescaled into `[0, 1]`
//! per axis during the build. Queries are normalized with the same tables and
//! follow a single root-to-leaf path, which makes lookups approximate: the
//! best match is only searched for within the leaf the query lands in.

mod build;
mod query;

#[cfg(test)]
mod tests;

pub use query::Neighbor;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Default maximum number of entries per leaf.
pub const DEFAULT_LEAF_SIZE: usize = 10;

// slack for normalized components that were rounded on their way through JSON
const RANGE_TOLERANCE: f64 = 1e-9;

/// One analysis frame of one corpus source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusEntry {
    /// Index of the source file within its corpus.
    pub source_id: usize,
    /// Sample offset of the frame at the source's native rate.
    pub marker: u64,
    /// Feature vector (normalized once the entry is stored in an index).
    pub vector: Vec<f64>,
}

impl CorpusEntry {
    /// Creates a new entry.
    pub fn new(source_id: usize, marker: u64, vector: Vec<f64>) -> Self {
        Self {
            source_id,
            marker,
            vector,
        }
    }
}

/// A node of the index arena.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    /// Terminal node holding `entries[start..start + len]`.
    Leaf {
        /// First entry of the leaf.
        start: usize,
        /// Number of entries in the leaf.
        len: usize,
    },
    /// Interior node splitting on one axis.
    Split {
        /// Axis compared at this node.
        axis: usize,
        /// Normalized threshold; queries at or above it go right.
        threshold: f64,
        /// Arena index of the lower half.
        left: usize,
        /// Arena index of the upper half.
        right: usize,
    },
}

/// Approximate nearest-neighbour index over corpus frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialIndex {
    dims: usize,
    leaf_size: usize,
    min: Vec<f64>,
    norm: Vec<f64>,
    nodes: Vec<Node>,
    entries: Vec<CorpusEntry>,
}

impl SpatialIndex {
    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the index holds no entries.
    ///
    /// A successfully built index is never empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dimensionality of stored vectors.
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Maximum number of entries per leaf.
    pub fn leaf_size(&self) -> usize {
        self.leaf_size
    }

    /// Per-axis minimum of the raw vectors.
    pub fn min(&self) -> &[f64] {
        &self.min
    }

    /// Per-axis normalization divisor.
    pub fn norm(&self) -> &[f64] {
        &self.norm
    }

    /// The node arena; the root is at index 0.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// All stored entries, grouped by leaf.
    pub fn entries(&self) -> &[CorpusEntry] {
        &self.entries
    }

    /// Iterates over the entries of every leaf, in arena order.
    pub fn leaves(&self) -> impl Iterator<Item = &[CorpusEntry]> + '_ {
        self.nodes.iter().filter_map(move |node| match *node {
            Node::Leaf { start, len } => Some(&self.entries[start..start + len]),
            Node::Split { .. } => None,
        })
    }

    /// Number of nodes on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(0usize, 1usize)];
        while let Some((node, depth)) = stack.pop() {
            match self.nodes.get(node) {
                Some(Node::Split { left, right, .. }) => {
                    stack.push((*left, depth + 1));
                    stack.push((*right, depth + 1));
                }
                Some(Node::Leaf { .. }) => deepest = deepest.max(depth),
                None => {}
            }
        }
        deepest
    }

    /// Scales a raw vector into the index's normalized space.
    pub fn normalize(&self, vector: &[f64]) -> CoreResult<Vec<f64>> {
        if vector.len() != self.dims {
            return Err(CoreError::DimensionMismatch {
                expected: self.dims,
                found: vector.len(),
            });
        }
        Ok(vector
            .iter()
            .zip(self.min.iter().zip(&self.norm))
            .map(|(v, (min, norm))| (v - min) / norm)
            .collect())
    }

    /// Checks the structure of an index that was read from a snapshot.
    pub fn validate(&self) -> CoreResult<()> {
        if self.dims == 0 || self.leaf_size == 0 {
            return corrupt("dimensionality and leaf size must be positive");
        }
        if self.entries.is_empty() || self.nodes.is_empty() {
            return corrupt("index has no entries");
        }
        if self.min.len() != self.dims || self.norm.len() != self.dims {
            return corrupt(format!(
                "normalization tables have {} and {} axes, expected {}",
                self.min.len(),
                self.norm.len(),
                self.dims
            ));
        }
        let unusable_norm = self.norm.iter().any(|n| !n.is_finite() || *n <= 0.0);
        if unusable_norm || self.min.iter().any(|m| !m.is_finite()) {
            return corrupt("normalization tables contain unusable values");
        }

        let mut referenced = vec![false; self.nodes.len()];
        let mut covered = 0usize;
        for (i, node) in self.nodes.iter().enumerate() {
            match *node {
                Node::Leaf { start, len } => {
                    if len == 0 || len > self.leaf_size {
                        return corrupt(format!("leaf {} holds {} entries", i, len));
                    }
                    let end = start.checked_add(len);
                    if end.map_or(true, |end| end > self.entries.len()) {
                        return corrupt(format!("leaf {} range is out of bounds", i));
                    }
                    covered += len;
                }
                Node::Split {
                    axis,
                    threshold,
                    left,
                    right,
                } => {
                    if axis >= self.dims || !threshold.is_finite() {
                        return corrupt(format!("split {} is malformed", i));
                    }
                    for child in [left, right] {
                        if child <= i || child >= self.nodes.len() || referenced[child] {
                            return corrupt(format!("split {} has invalid child {}", i, child));
                        }
                        referenced[child] = true;
                    }
                }
            }
        }
        if covered != self.entries.len() {
            return corrupt(format!(
                "leaves cover {} of {} entries",
                covered,
                self.entries.len()
            ));
        }

        for entry in &self.entries {
            if entry.vector.len() != self.dims {
                return Err(CoreError::DimensionMismatch {
                    expected: self.dims,
                    found: entry.vector.len(),
                });
            }
            let in_range = entry
                .vector
                .iter()
                .all(|v| (-RANGE_TOLERANCE..=1.0 + RANGE_TOLERANCE).contains(v));
            if !in_range {
                return corrupt(format!(
                    "entry of source {} at {} is outside the normalized range",
                    entry.source_id, entry.marker
                ));
            }
        }
        Ok(())
    }
}

fn corrupt(message: impl Into<String>) -> CoreResult<()> {
    Err(CoreError::invalid_input(format!("corrupt index: {}", message.into())))
}
