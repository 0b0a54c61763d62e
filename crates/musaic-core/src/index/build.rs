//! Index construction: rank partitioning and per-axis normalization.

use rand::Rng;
use rayon::prelude::*;
use tracing::debug;

use crate::error::{CoreError, CoreResult};

use super::{CorpusEntry, Node, SpatialIndex};

/// A range of entries waiting to be partitioned into `node`.
struct Pending {
    node: usize,
    start: usize,
    end: usize,
    axis: usize,
}

impl SpatialIndex {
    /// Builds an index over `entries`.
    ///
    /// The first split axis is drawn from `rng`; deeper levels cycle through
    /// the remaining axes. Each range longer than `leaf_size` is sorted on its
    /// axis and split at the positional median, so both halves always shrink.
    ///
    /// # Errors
    /// * `InvalidInput` if `entries` is empty, `leaf_size` is zero, or a vector
    ///   is empty or contains non-finite values
    /// * `DimensionMismatch` if vectors have differing lengths
    pub fn build<R: Rng>(
        mut entries: Vec<CorpusEntry>,
        leaf_size: usize,
        rng: &mut R,
    ) -> CoreResult<Self> {
        if entries.is_empty() {
            return Err(CoreError::invalid_input("cannot index an empty corpus"));
        }
        if leaf_size == 0 {
            return Err(CoreError::invalid_input("leaf size must be at least 1"));
        }
        let dims = entries[0].vector.len();
        if dims == 0 {
            return Err(CoreError::invalid_input("feature vectors are empty"));
        }
        for entry in &entries {
            if entry.vector.len() != dims {
                return Err(CoreError::DimensionMismatch {
                    expected: dims,
                    found: entry.vector.len(),
                });
            }
            if entry.vector.iter().any(|v| !v.is_finite()) {
                return Err(CoreError::invalid_input(format!(
                    "feature vector of source {} at {} contains non-finite values",
                    entry.source_id, entry.marker
                )));
            }
        }

        let (min, max) = axis_bounds(&entries, dims);
        let norm = axis_norms(&min, &max);

        let first_axis = rng.gen_range(0..dims);
        let nodes = partition(&mut entries, leaf_size, dims, first_axis);

        let mut index = Self {
            dims,
            leaf_size,
            min,
            norm,
            nodes,
            entries,
        };
        index.fit();

        debug!(
            entries = index.entries.len(),
            nodes = index.nodes.len(),
            dims,
            first_axis,
            "built spatial index"
        );
        Ok(index)
    }

    /// Rescales stored vectors and split thresholds into `[0, 1]`.
    fn fit(&mut self) {
        let min = &self.min;
        let norm = &self.norm;
        self.entries.par_iter_mut().for_each(|entry| {
            for (axis, v) in entry.vector.iter_mut().enumerate() {
                *v = (*v - min[axis]) / norm[axis];
            }
        });
        for node in self.nodes.iter_mut() {
            if let Node::Split {
                axis, threshold, ..
            } = node
            {
                *threshold = (*threshold - min[*axis]) / norm[*axis];
            }
        }
    }
}

/// Per-axis minimum and maximum over all entries.
fn axis_bounds(entries: &[CorpusEntry], dims: usize) -> (Vec<f64>, Vec<f64>) {
    let empty = || (vec![f64::INFINITY; dims], vec![f64::NEG_INFINITY; dims]);
    entries
        .par_iter()
        .fold(empty, |(mut lo, mut hi), entry| {
            for (axis, &v) in entry.vector.iter().enumerate() {
                lo[axis] = lo[axis].min(v);
                hi[axis] = hi[axis].max(v);
            }
            (lo, hi)
        })
        .reduce(empty, |(mut lo, mut hi), (other_lo, other_hi)| {
            for axis in 0..dims {
                lo[axis] = lo[axis].min(other_lo[axis]);
                hi[axis] = hi[axis].max(other_hi[axis]);
            }
            (lo, hi)
        })
}

fn axis_norms(min: &[f64], max: &[f64]) -> Vec<f64> {
    min.iter()
        .zip(max)
        .enumerate()
        .map(|(axis, (lo, hi))| {
            let range = hi - lo;
            if range.is_finite() && range > 0.0 {
                range
            } else {
                debug!(axis, range, "degenerate feature axis, using unit norm");
                1.0
            }
        })
        .collect()
}

/// Partitions `entries` in place and returns the node arena.
fn partition(
    entries: &mut [CorpusEntry],
    leaf_size: usize,
    dims: usize,
    first_axis: usize,
) -> Vec<Node> {
    let mut nodes = vec![Node::Leaf { start: 0, len: 0 }];
    let mut stack = vec![Pending {
        node: 0,
        start: 0,
        end: entries.len(),
        axis: first_axis,
    }];

    while let Some(Pending {
        node,
        start,
        end,
        axis,
    }) = stack.pop()
    {
        let len = end - start;
        if len <= leaf_size {
            nodes[node] = Node::Leaf { start, len };
            continue;
        }

        let range = &mut entries[start..end];
        range.sort_by(|a, b| a.vector[axis].total_cmp(&b.vector[axis]));
        let mid = start + len / 2;
        let threshold = entries[mid].vector[axis];

        let left = nodes.len();
        let right = left + 1;
        nodes.push(Node::Leaf { start, len: 0 });
        nodes.push(Node::Leaf { start: mid, len: 0 });
        nodes[node] = Node::Split {
            axis,
            threshold,
            left,
            right,
        };

        let next = (axis + 1) % dims;
        stack.push(Pending {
            node: right,
            start: mid,
            end,
            axis: next,
        });
        stack.push(Pending {
            node: left,
            start,
            end: mid,
            axis: next,
        });
    }
    nodes
}
