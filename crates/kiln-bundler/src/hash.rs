//! Content hashing for output filenames.

/// Hex digits kept from the digest.
pub const HASH_LEN: usize = 32;

/// Content hash used in `[hash]` placeholders.
pub fn content_hash(bytes: &[u8]) -> String {
    let hex = blake3::hash(bytes).to_hex();
    hex.as_str()[..HASH_LEN].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_and_truncated() {
        let a = content_hash(b"hello");
        assert_eq!(a.len(), HASH_LEN);
        assert_eq!(a, content_hash(b"hello"));
        assert_ne!(a, content_hash(b"hello!"));
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
