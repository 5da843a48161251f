use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of `input`.
///
/// Story guids, cached image filenames and per-feed output filenames are all
/// derived from this, so two inputs that are byte-identical always map to the
/// same name.
pub fn content_hash(input: &str) -> String {
    let hash = Sha256::digest(input.as_bytes());
    format!("{:x}", hash)
}
