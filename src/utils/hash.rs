//! Hashing utilities

use sha2::{Sha256, Digest};

/// Hex-encoded SHA-256 over a sequence of byte chunks
pub fn sha256_hex(chunks: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for chunk in chunks {
        // Length prefix keeps ("ab", "c") and ("a", "bc") apart
        hasher.update((chunk.len() as u64).to_le_bytes());
        hasher.update(chunk);
    }
    let hash = hasher.finalize();

    hash.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_stable_and_chunk_sensitive() {
        let a = sha256_hex(&[&b"ab"[..], &b"c"[..]]);
        let b = sha256_hex(&[&b"a"[..], &b"bc"[..]]);
        assert_eq!(a.len(), 64);
        assert_eq!(a, sha256_hex(&[&b"ab"[..], &b"c"[..]]));
        assert_ne!(a, b);
    }
}
