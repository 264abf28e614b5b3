use sha2::{Digest, Sha256};

/// Redacts a sensitive value into a stable pseudonymous token.
///
/// SHA-256 over the UTF-8 bytes, lowercase hex. No salt is mixed in, so
/// the same input yields the same token across restarts.
pub fn mask(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    let out = hasher.finalize();
    hex::encode(out)
}
