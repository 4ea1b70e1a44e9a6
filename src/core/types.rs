// Basic types for block hashing

use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of a SHA-256 digest in hex characters
pub const DIGEST_HEX_LEN: usize = 64;

/// Hex-encoded SHA-256 digest (64 lowercase characters)
/// Used for block hashes and previous-block links
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexDigest(String);

impl HexDigest {
    /// Wrap raw digest bytes
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Create from a hex string, validating length and alphabet
    pub fn from_hex(hex_str: &str) -> Result<Self, String> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| format!("Invalid hex string: {}", e))?;
        if bytes.len() != DIGEST_HEX_LEN / 2 {
            return Err(format!(
                "Invalid digest length: expected {}, got {}",
                DIGEST_HEX_LEN / 2,
                bytes.len()
            ));
        }
        Ok(Self(hex_str.to_ascii_lowercase()))
    }

    /// All-zero digest (predecessor of the genesis block)
    pub fn zero() -> Self {
        Self("0".repeat(DIGEST_HEX_LEN))
    }

    /// Get the digest as a hex string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Count leading '0' hex digits (achieved difficulty)
    pub fn leading_zeros(&self) -> usize {
        self.0.bytes().take_while(|b| *b == b'0').count()
    }
}

impl TryFrom<String> for HexDigest {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<HexDigest> for String {
    fn from(digest: HexDigest) -> Self {
        digest.0
    }
}

impl fmt::Display for HexDigest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}
