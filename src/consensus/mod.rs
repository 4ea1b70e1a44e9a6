// Proof-of-work target and nonce search

mod error;
pub mod pow;
pub mod parallel;

pub use error::{DigestError, MiningError};
pub use pow::{HashTarget, Miner, MinerConfig, MiningResult};
pub use parallel::CancelToken;
