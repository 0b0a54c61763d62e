//! Determinism checks for rendered audio.

use musaic_core::AudioBuffer;

/// Result of rendering the same thing several times.
#[derive(Debug, Clone)]
pub struct DeterminismResult {
    /// Whether all runs produced identical samples.
    pub is_deterministic: bool,
    /// Number of runs performed.
    pub runs: usize,
    /// BLAKE3 hash of the first run.
    pub hash: String,
    /// Index of the first run whose hash differed.
    pub first_mismatch: Option<usize>,
}

/// BLAKE3 hash over a buffer's layout and sample bits.
pub fn buffer_hash(buffer: &AudioBuffer) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(buffer.channels() as u64).to_le_bytes());
    hasher.update(&buffer.sample_rate().to_le_bytes());
    for sample in buffer.samples() {
        hasher.update(&sample.to_bits().to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Runs `render` `runs` times and compares the hashes.
pub fn verify_determinism<F>(render: F, runs: usize) -> DeterminismResult
where
    F: Fn() -> AudioBuffer,
{
    let hashes: Vec<String> = (0..runs.max(1)).map(|_| buffer_hash(&render())).collect();
    let first_mismatch = hashes.iter().position(|h| h != &hashes[0]);
    DeterminismResult {
        is_deterministic: first_mismatch.is_none(),
        runs: hashes.len(),
        hash: hashes[0].clone(),
        first_mismatch,
    }
}
