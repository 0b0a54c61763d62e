use super::*;
use crate::error::ErrorKind;
use crate::rng::create_rng;

/// 50 entries on two axes with distinct values per axis.
fn grid_entries() -> Vec<CorpusEntry> {
    (0..50)
        .map(|i| {
            CorpusEntry::new(
                i % 3,
                (i * 512) as u64,
                vec![i as f64, ((i * 7) % 50) as f64 * 0.5 - 3.0],
            )
        })
        .collect()
}

fn build(entries: Vec<CorpusEntry>, leaf_size: usize) -> SpatialIndex {
    SpatialIndex::build(entries, leaf_size, &mut create_rng(42)).unwrap()
}

#[test]
fn test_build_rejects_bad_input() {
    let mut rng = create_rng(1);
    let err = SpatialIndex::build(Vec::new(), 10, &mut rng).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let err = SpatialIndex::build(grid_entries(), 0, &mut rng).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let mut ragged = grid_entries();
    ragged[7].vector.push(1.0);
    let err = SpatialIndex::build(ragged, 10, &mut rng).unwrap_err();
    assert!(matches!(
        err,
        CoreError::DimensionMismatch {
            expected: 2,
            found: 3
        }
    ));

    let mut nan = grid_entries();
    nan[3].vector[0] = f64::NAN;
    assert!(SpatialIndex::build(nan, 10, &mut rng).is_err());
}

#[test]
fn test_leaves_respect_leaf_size() {
    for leaf_size in [1, 2, 3, 10, 49, 50, 100] {
        let index = build(grid_entries(), leaf_size);
        let mut total = 0;
        for leaf in index.leaves() {
            assert!(!leaf.is_empty());
            assert!(leaf.len() <= leaf_size, "leaf of {} > {}", leaf.len(), leaf_size);
            total += leaf.len();
        }
        assert_eq!(total, 50);
        assert!(index.validate().is_ok());
    }
}

#[test]
fn test_single_leaf_when_small() {
    let index = build(grid_entries(), 50);
    assert_eq!(index.nodes().len(), 1);
    assert_eq!(index.depth(), 1);
}

#[test]
fn test_components_are_normalized() {
    let index = build(grid_entries(), 4);
    for entry in index.entries() {
        for v in &entry.vector {
            assert!((0.0..=1.0).contains(v), "component {} out of range", v);
        }
    }
    assert_eq!(index.min(), &[0.0, -3.0]);
    assert_eq!(index.norm(), &[49.0, 24.5]);
}

#[test]
fn test_degenerate_axis_uses_unit_norm() {
    let entries = (0..20)
        .map(|i| CorpusEntry::new(0, i as u64, vec![i as f64, 5.0]))
        .collect();
    let index = build(entries, 3);
    assert_eq!(index.norm()[1], 1.0);
    assert!(index.entries().iter().all(|e| e.vector[1] == 0.0));

    let neighbors = index.knn(&[4.0, 5.0], 1).unwrap();
    assert_eq!(neighbors.len(), 1);
}

#[test]
fn test_knn_sorted_and_bounded() {
    let index = build(grid_entries(), 10);
    for i in 0..30 {
        let query = [i as f64 * 1.7 - 5.0, (i % 11) as f64 - 2.0];
        for first_n in [1, 3, 10, 20] {
            let neighbors = index.knn(&query, first_n).unwrap();
            assert!(!neighbors.is_empty());
            assert!(neighbors.len() <= first_n);
            assert!(neighbors.windows(2).all(|w| w[0].cost <= w[1].cost));
        }
    }
}

#[test]
fn test_knn_zero_returns_nothing() {
    let index = build(grid_entries(), 10);
    assert!(index.knn(&[1.0, 1.0], 0).unwrap().is_empty());
}

#[test]
fn test_stored_vector_finds_itself() {
    let entries = grid_entries();
    let index = build(entries.clone(), 5);
    for entry in &entries {
        let best = index.knn(&entry.vector, 1).unwrap()[0];
        assert_eq!(best.marker, entry.marker);
        assert_eq!(best.source_id, entry.source_id);
        assert_eq!(best.cost, 0.0);
    }
}

#[test]
fn test_query_dimension_mismatch() {
    let index = build(grid_entries(), 10);
    let err = index.knn(&[1.0, 2.0, 3.0], 5).unwrap_err();
    assert_eq!(err.code(), "MUSAIC_002");
}

#[test]
fn test_build_is_deterministic_per_seed() {
    let a = SpatialIndex::build(grid_entries(), 4, &mut create_rng(9)).unwrap();
    let b = SpatialIndex::build(grid_entries(), 4, &mut create_rng(9)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_split_axes_cycle() {
    let index = build(grid_entries(), 2);
    let mut seen = [false; 2];
    for node in index.nodes() {
        if let Node::Split {
            axis, left, right, ..
        } = *node
        {
            seen[axis] = true;
            for child in [left, right] {
                if let Node::Split { axis: child_axis, .. } = index.nodes()[child] {
                    assert_eq!(child_axis, (axis + 1) % 2);
                }
            }
        }
    }
    assert!(seen.iter().all(|s| *s));
}

#[test]
fn test_serde_preserves_queries() {
    let index = build(grid_entries(), 6);
    let json = serde_json::to_string(&index).unwrap();
    let restored: SpatialIndex = serde_json::from_str(&json).unwrap();
    restored.validate().unwrap();
    let query = [12.5, 4.0];
    assert_eq!(index.knn(&query, 6).unwrap(), restored.knn(&query, 6).unwrap());
}

#[test]
fn test_validate_detects_corruption() {
    let index = build(grid_entries(), 6);

    let mut bad_child = index.clone();
    if let Some(Node::Split { right, .. }) = bad_child.nodes.first_mut() {
        *right = 999;
    }
    assert_eq!(bad_child.validate().unwrap_err().kind(), ErrorKind::InvalidInput);

    let mut bad_leaf = index.clone();
    if let Some(Node::Leaf { len, .. }) = bad_leaf
        .nodes
        .iter_mut()
        .find(|n| matches!(n, Node::Leaf { .. }))
    {
        *len = 100;
    }
    assert!(bad_leaf.validate().is_err());

    let mut bad_value = index.clone();
    bad_value.entries[0].vector[0] = 3.5;
    assert!(bad_value.validate().is_err());

    let mut bad_norm = index;
    bad_norm.norm[1] = 0.0;
    assert!(bad_norm.validate().is_err());
}
