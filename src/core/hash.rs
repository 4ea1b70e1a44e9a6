// Hashing utilities for block headers

use sha2::{Digest, Sha256};
use crate::consensus::DigestError;
use crate::core::HexDigest;

/// Digest capability used by the miner
/// Implementations must be deterministic and free of side effects
pub trait HashFunction: Send + Sync {
    /// Hash `data` and return its lowercase hex encoding
    fn digest_hex(&self, data: &[u8]) -> Result<HexDigest, DigestError>;
}

/// SHA-256 backed by the `sha2` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl HashFunction for Sha256Hasher {
    #[inline]
    fn digest_hex(&self, data: &[u8]) -> Result<HexDigest, DigestError> {
        Ok(sha256_hex(data))
    }
}

/// Single SHA256 hash, hex-encoded
pub fn sha256_hex(data: &[u8]) -> HexDigest {
    HexDigest::from_bytes(&Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        let hash = sha256_hex(b"abc");
        assert_eq!(
            hash.as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_sha256_empty() {
        let hash = sha256_hex(b"");
        assert_eq!(
            hash.as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_hasher_matches_free_function() {
        let data = b"hello world";
        let hash = Sha256Hasher.digest_hex(data).unwrap();
        assert_eq!(hash, sha256_hex(data));
        assert_eq!(hash.as_str().len(), 64);
    }
}
