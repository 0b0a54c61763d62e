//! Approximate k-nearest-neighbour lookup.

use serde::{Deserialize, Serialize};

use crate::error::CoreResult;

use super::{CorpusEntry, Node, SpatialIndex};

/// A stored entry returned by a query, with its distance to the query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// Source file index within the corpus.
    pub source_id: usize,
    /// Sample offset of the matching frame.
    pub marker: u64,
    /// Euclidean distance in normalized feature space.
    pub cost: f64,
}

impl SpatialIndex {
    /// Returns up to `first_n` neighbours of `query`, nearest first.
    ///
    /// The query follows one root-to-leaf path (right when its component is
    /// at or above the split threshold) and only the entries of the reached
    /// leaf are ranked. A non-empty index returns at least one neighbour
    /// whenever `first_n >= 1`.
    ///
    /// # Errors
    /// Returns `DimensionMismatch` if `query` does not have [`dims`](Self::dims)
    /// components.
    pub fn knn(&self, query: &[f64], first_n: usize) -> CoreResult<Vec<Neighbor>> {
        let query = self.normalize(query)?;
        let leaf = self.descend(&query);

        let mut neighbors: Vec<Neighbor> = leaf
            .iter()
            .map(|entry| Neighbor {
                source_id: entry.source_id,
                marker: entry.marker,
                cost: euclidean(&query, &entry.vector),
            })
            .collect();
        neighbors.sort_by(|a, b| a.cost.total_cmp(&b.cost));
        neighbors.truncate(first_n);
        Ok(neighbors)
    }

    fn descend(&self, query: &[f64]) -> &[CorpusEntry] {
        let mut current = 0;
        loop {
            match self.nodes.get(current) {
                Some(Node::Split {
                    axis,
                    threshold,
                    left,
                    right,
                }) => {
                    current = if query[*axis] >= *threshold {
                        *right
                    } else {
                        *left
                    };
                }
                Some(Node::Leaf { start, len }) => return &self.entries[*start..*start + *len],
                None => return &[],
            }
        }
    }
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}
