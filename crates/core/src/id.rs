// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Bramble Authors

use sha2::{Digest, Sha256};

/// Generate a time-sortable note ID from its creation time and content.
/// Format: {zero-padded epoch millis}-{hash} where hash is the first
/// 8 hex chars of SHA256(content + millis). Zero-padding keeps the ids
/// lexicographically ordered by creation time.
pub fn generate(created_at_ms: i64, seed: &str) -> String {
    let input = format!("{}{}", seed, created_at_ms);
    let hash = Sha256::digest(input.as_bytes());
    let short_hash = hex::encode(&hash[..4]); // First 8 hex chars (4 bytes)
    format!("{:013}-{}", created_at_ms.max(0), short_hash)
}

/// Generate a unique ID, handling collisions by appending incrementing suffix.
pub fn generate_unique<F>(created_at_ms: i64, seed: &str, exists: F) -> String
where
    F: Fn(&str) -> bool,
{
    let base_id = generate(created_at_ms, seed);

    if !exists(&base_id) {
        return base_id;
    }

    // Handle collision with incrementing suffix
    let mut suffix = 2;
    loop {
        let id = format!("{}-{}", base_id, suffix);
        if !exists(&id) {
            return id;
        }
        suffix += 1;
    }
}

/// Derive the ID for a conflict fork of `original`, distinguished by the
/// moment the conflict was detected.
pub fn conflict_fork(original: &str, at_ms: i64) -> String {
    format!("{}-conflict-{}", original, at_ms)
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
