//! Content hashing helpers
//!
//! Used for: generalization cache keys (§4.3), signal id derivation (§3),
//! and the cycle manager's content-delta gate (§4.8).

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest of `text`.
pub fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Absolute character-count delta between two corpora, used by the cycle
/// manager's content-threshold policy (spec §6).
pub fn char_delta(previous_len: usize, current_len: usize) -> usize {
    previous_len.abs_diff(current_len)
}
