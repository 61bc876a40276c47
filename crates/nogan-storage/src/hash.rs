//! Content digests for snapshots using blake3.
//!
//! A snapshot's digest is the blake3 hash of its JSON text. The text is
//! deterministic for a given store: every map in the model is ordered, so the
//! same store always serializes to the same bytes.

/// Hashes a snapshot body.
pub fn digest(json: &str) -> blake3::Hash {
    blake3::hash(json.as_bytes())
}

/// Hashes a snapshot body, rendered as lowercase hex.
pub fn digest_hex(json: &str) -> String {
    digest(json).to_hex().to_string()
}

/// Checks `json` against a stored hex digest.
pub fn verify(json: &str, expected: &str) -> bool {
    digest_hex(json) == expected
}
