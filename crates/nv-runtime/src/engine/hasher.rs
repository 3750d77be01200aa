use sha2::{Digest, Sha256};

use super::*;

/// Turns a step's serialized source into the fingerprint used to key
/// per-step ledgers and to detect drift between a save and the current code.
///
/// Equal source text always hashes equally. Behaviorally identical steps
/// written differently hash differently; callers treat a mismatch as "a
/// different step", never as an error.
pub trait StepHasher {
    fn hash(&self, source: &str) -> StepHash;
}

/// SHA-256 over the case-folded source, lower-case hex.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256StepHasher;

impl StepHasher for Sha256StepHasher {
    fn hash(&self, source: &str) -> StepHash {
        let mut hasher = Sha256::new();
        hasher.update(source.to_lowercase().as_bytes());
        StepHash::new(format!("{:x}", hasher.finalize()))
    }
}
