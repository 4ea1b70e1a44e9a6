// Mining error types

use std::fmt;

/// Failure reported by a digest implementation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestError {
    pub message: String,
}

impl DigestError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for DigestError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Digest failure: {}", self.message)
    }
}

impl std::error::Error for DigestError {}

/// Mining error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiningError {
    /// The digest function failed; the search was aborted
    Digest(DigestError),
    /// The attempt budget ran out before the target was met
    NotFound { attempts: u64 },
    /// The caller cancelled the search
    Cancelled,
    /// Miner configuration cannot run a search
    InvalidConfig(String),
}

impl fmt::Display for MiningError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MiningError::Digest(e) => write!(f, "{}", e),
            MiningError::NotFound { attempts } => {
                write!(f, "No valid nonce found after {} attempts", attempts)
            }
            MiningError::Cancelled => write!(f, "Mining cancelled"),
            MiningError::InvalidConfig(msg) => write!(f, "Invalid miner configuration: {}", msg),
        }
    }
}

impl std::error::Error for MiningError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MiningError::Digest(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DigestError> for MiningError {
    fn from(e: DigestError) -> Self {
        MiningError::Digest(e)
    }
}
