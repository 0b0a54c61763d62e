//! Deterministic RNG using PCG32 with BLAKE3 seed derivation.
//!
//! Every random decision in the core (the first split axis of an index,
//! onset jitter, pan offsets, grain selection) draws from a generator created
//! here. Seeds are derived with BLAKE3 so that independent components and
//! segments get independent streams, and parallel rendering stays
//! reproducible for a given base seed.

use rand::SeedableRng;
use rand_pcg::Pcg32;

/// Creates a PCG32 RNG from a 32-bit seed.
///
/// The 32-bit seed is expanded to 64 bits by duplicating the value in both
/// halves, as required by PCG32's state initialization.
pub fn create_rng(seed: u32) -> Pcg32 {
    let seed64 = (seed as u64) | ((seed as u64) << 32);
    Pcg32::seed_from_u64(seed64)
}

/// Returns `seed`, or a fresh random seed when none was given.
pub fn resolve_seed(seed: Option<u32>) -> u32 {
    seed.unwrap_or_else(rand::random)
}

/// Derives a seed for a single synthesis segment from the base seed.
///
/// Uses BLAKE3 to hash the base seed concatenated with the segment index.
pub fn derive_segment_seed(base_seed: u32, segment: u64) -> u32 {
    let mut input = Vec::with_capacity(12);
    input.extend_from_slice(&base_seed.to_le_bytes());
    input.extend_from_slice(&segment.to_le_bytes());
    truncate_hash(blake3::hash(&input))
}

/// Derives a seed for a named component from the base seed.
///
/// # Arguments
/// * `base_seed` - The run's base seed
/// * `key` - A string identifier for the component (`"index"`, `"onset"`, `"pan"`)
pub fn derive_component_seed(base_seed: u32, key: &str) -> u32 {
    let mut input = Vec::with_capacity(4 + key.len());
    input.extend_from_slice(&base_seed.to_le_bytes());
    input.extend_from_slice(key.as_bytes());
    truncate_hash(blake3::hash(&input))
}

/// Creates an RNG for a named component.
pub fn create_component_rng(base_seed: u32, key: &str) -> Pcg32 {
    create_rng(derive_component_seed(base_seed, key))
}

/// Creates an RNG for a single synthesis segment.
pub fn create_segment_rng(base_seed: u32, segment: u64) -> Pcg32 {
    create_rng(derive_segment_seed(base_seed, segment))
}

// first 4 bytes, little-endian
fn truncate_hash(hash: blake3::Hash) -> u32 {
    let bytes = hash.as_bytes();
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}
