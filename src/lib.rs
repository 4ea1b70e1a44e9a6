// Proof-of-work block miner
// Finds a nonce whose SHA-256 header digest starts with a required number of zero hex digits

pub mod core;
pub mod consensus;
pub mod cli;

// Re-exports for convenience
pub use crate::core::{Block, BlockHeader, HashFunction, HexDigest, Sha256Hasher};
pub use crate::consensus::{CancelToken, DigestError, HashTarget, Miner, MinerConfig, MiningError, MiningResult};
pub use crate::cli::{Cli, CliHandler};
