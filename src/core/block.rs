// Block data structures

use crate::consensus::DigestError;
use crate::core::{HashFunction, HexDigest};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Block header - the fields covered by proof-of-work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Position of the block in its chain
    pub index: u64,
    /// Block timestamp (Unix epoch seconds)
    pub timestamp: u64,
    /// Hash of the previous block, hashed verbatim
    pub previous_hash: String,
    /// Nonce for proof-of-work
    pub nonce: u64,
}

impl BlockHeader {
    /// Create a new block header
    pub fn new(index: u64, timestamp: u64, previous_hash: impl Into<String>, nonce: u64) -> Self {
        Self {
            index,
            timestamp,
            previous_hash: previous_hash.into(),
            nonce,
        }
    }

    /// Canonical pre-image: index, timestamp, previous hash and nonce
    /// concatenated without separators. Changing this changes every hash.
    pub fn canonical_string(&self) -> String {
        format!(
            "{}{}{}{}",
            self.index, self.timestamp, self.previous_hash, self.nonce
        )
    }

    /// Calculate the hash of this header with the given digest function
    pub fn hash_with<H: HashFunction + ?Sized>(&self, hasher: &H) -> Result<HexDigest, DigestError> {
        hasher.digest_hex(self.canonical_string().as_bytes())
    }

    /// Private copy of this header carrying a different nonce
    pub fn with_nonce(&self, nonce: u64) -> Self {
        Self {
            nonce,
            ..self.clone()
        }
    }
}

impl fmt::Display for BlockHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Block #{} (timestamp: {}, previous: {}, nonce: {})",
            self.index, self.timestamp, self.previous_hash, self.nonce
        )
    }
}

/// Block - header plus the hash assigned once it has been mined
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Block header
    pub header: BlockHeader,
    /// Proof-of-work hash, `None` until mined
    pub hash: Option<HexDigest>,
}

impl Block {
    /// Create a new unmined block starting at nonce 0
    pub fn new(index: u64, timestamp: u64, previous_hash: impl Into<String>) -> Self {
        Self {
            header: BlockHeader::new(index, timestamp, previous_hash, 0),
            hash: None,
        }
    }

    /// Create the genesis block (index 0, all-zero predecessor)
    pub fn genesis(timestamp: u64) -> Self {
        Self::new(0, timestamp, HexDigest::zero().as_str())
    }

    /// Create the unmined successor of this block
    pub fn next(&self, timestamp: u64) -> Result<Self, String> {
        let hash = self
            .hash
            .as_ref()
            .ok_or_else(|| format!("Block #{} has not been mined", self.header.index))?;
        let index = self
            .header
            .index
            .checked_add(1)
            .ok_or_else(|| format!("Block #{} has no successor index", self.header.index))?;
        Ok(Self::new(index, timestamp, hash.as_str()))
    }

    /// Whether a proof-of-work hash has been recorded
    pub fn is_solved(&self) -> bool {
        self.hash.is_some()
    }

    /// Record a solution. Nonce and hash are always written together.
    pub fn apply_solution(&mut self, nonce: u64, hash: HexDigest) {
        self.header.nonce = nonce;
        self.hash = Some(hash);
    }

    /// Check if this is the genesis block
    pub fn is_genesis(&self) -> bool {
        self.header.index == 0 && self.header.previous_hash == HexDigest::zero().as_str()
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.hash {
            Some(hash) => write!(f, "{} -> {}", self.header, hash),
            None => write!(f, "{} -> (unmined)", self.header),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Sha256Hasher, sha256_hex};

    #[test]
    fn test_canonical_string_order() {
        let header = BlockHeader::new(1, 1000, "abc", 42);
        assert_eq!(header.canonical_string(), "11000abc42");
    }

    #[test]
    fn test_header_hash_matches_preimage() {
        let prev = HexDigest::zero();
        let header = BlockHeader::new(1, 1000, prev.as_str(), 7);

        let expected = sha256_hex(format!("11000{}7", prev).as_bytes());
        assert_eq!(header.hash_with(&Sha256Hasher).unwrap(), expected);
    }

    #[test]
    fn test_header_hash_deterministic() {
        let header = BlockHeader::new(3, 1234567890, "prev", 99);
        let hash1 = header.hash_with(&Sha256Hasher).unwrap();
        let hash2 = header.clone().hash_with(&Sha256Hasher).unwrap();
        assert_eq!(hash1, hash2);

        let other = header.with_nonce(100).hash_with(&Sha256Hasher).unwrap();
        assert_ne!(hash1, other);
    }

    #[test]
    fn test_with_nonce_copies_header() {
        let header = BlockHeader::new(1, 2, "p", 0);
        let copy = header.with_nonce(5);
        assert_eq!(header.nonce, 0);
        assert_eq!(copy.nonce, 5);
        assert_eq!(copy.previous_hash, header.previous_hash);
    }

    #[test]
    fn test_genesis_block() {
        let genesis = Block::genesis(1000);
        assert!(genesis.is_genesis());
        assert!(!genesis.is_solved());
        assert_eq!(genesis.header.nonce, 0);
    }

    #[test]
    fn test_next_requires_mined_block() {
        let genesis = Block::genesis(1000);
        assert!(genesis.next(1001).is_err());

        let mut mined = genesis.clone();
        let hash = mined.header.hash_with(&Sha256Hasher).unwrap();
        mined.apply_solution(0, hash.clone());

        let next = mined.next(1001).unwrap();
        assert_eq!(next.header.index, 1);
        assert_eq!(next.header.previous_hash, hash.as_str());
        assert!(!next.is_genesis());
    }

    #[test]
    fn test_block_json() {
        let mut block = Block::new(1, 1000, "prev");
        block.apply_solution(3, HexDigest::zero());

        let json = serde_json::to_string(&block).unwrap();
        let decoded: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(block, decoded);
    }

    #[test]
    fn test_block_json_rejects_bad_hash() {
        let json = r#"{"header":{"index":1,"timestamp":1000,"previous_hash":"prev","nonce":3},"hash":"ZZ"}"#;
        assert!(serde_json::from_str::<Block>(json).is_err());
    }

    #[test]
    fn test_next_at_max_index() {
        let mut last = Block::new(u64::MAX, 1000, "prev");
        last.apply_solution(0, HexDigest::zero());
        assert!(last.next(1001).is_err());
    }
}
