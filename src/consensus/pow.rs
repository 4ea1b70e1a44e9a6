// Proof of Work implementation

use crate::consensus::MiningError;
use crate::core::{Block, HashFunction, HexDigest, Sha256Hasher};
use serde::Serialize;
use std::time::{Duration, Instant};

/// Default number of attempts between progress log lines
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 100_000;

/// Difficulty target: a hash must start with `difficulty` zero hex digits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashTarget {
    difficulty: usize,
    /// Cached prefix for fast comparison
    required_prefix: String,
}

impl HashTarget {
    /// Create a new target requiring `difficulty` leading zeros
    pub fn new(difficulty: usize) -> Self {
        Self {
            difficulty,
            required_prefix: "0".repeat(difficulty),
        }
    }

    /// Number of leading zero hex digits required
    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    /// The zero prefix a valid hash starts with
    pub fn required_prefix(&self) -> &str {
        &self.required_prefix
    }

    /// Check if a hex hash meets this target.
    /// Hashes shorter than the prefix never do.
    #[inline]
    pub fn is_satisfied_by(&self, hash_hex: &str) -> bool {
        hash_hex
            .as_bytes()
            .get(..self.difficulty)
            .is_some_and(|prefix| prefix == self.required_prefix.as_bytes())
    }

    /// Expected number of hash evaluations to meet this target (16^difficulty)
    pub fn expected_attempts(&self) -> f64 {
        16f64.powf(self.difficulty as f64)
    }
}

/// Search parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinerConfig {
    /// Worker threads used by parallel mining
    pub workers: usize,
    /// Attempt budget; `None` searches until a solution is found
    pub max_attempts: Option<u64>,
    /// Attempts between progress log lines (0 disables)
    pub progress_interval: u64,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get().max(1),
            max_attempts: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

/// Proof of Work miner
pub struct Miner<H: HashFunction = Sha256Hasher> {
    /// Fixed difficulty target
    pub target: HashTarget,
    hasher: H,
    config: MinerConfig,
}

impl Miner {
    /// Create a new SHA-256 miner with fixed difficulty
    pub fn new(difficulty: usize) -> Self {
        Self::with_hasher(difficulty, Sha256Hasher)
    }
}

impl<H: HashFunction> Miner<H> {
    /// Create a miner using a custom digest function
    pub fn with_hasher(difficulty: usize, hasher: H) -> Self {
        Self {
            target: HashTarget::new(difficulty),
            hasher,
            config: MinerConfig::default(),
        }
    }

    /// Replace the search parameters
    pub fn with_config(mut self, config: MinerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &MinerConfig {
        &self.config
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Mine a block by trying nonces 0, 1, 2, ... on a single thread.
    ///
    /// The caller's block is only written once, after a solution is found;
    /// on error it is left untouched.
    pub fn mine(&self, block: &mut Block) -> Result<MiningResult, MiningError> {
        let start_time = Instant::now();
        let mut header = block.header.with_nonce(0);
        let mut attempts = 0u64;

        log::debug!(
            "Mining {} at difficulty {} (~{:.0} attempts expected)",
            header,
            self.target.difficulty(),
            self.target.expected_attempts()
        );

        loop {
            if let Some(max) = self.config.max_attempts {
                if attempts >= max {
                    log::debug!("Attempt budget of {} exhausted", max);
                    return Err(MiningError::NotFound { attempts });
                }
            }

            let hash = header.hash_with(&self.hasher)?;
            attempts += 1;

            if self.target.is_satisfied_by(hash.as_str()) {
                block.apply_solution(header.nonce, hash.clone());
                let result = MiningResult {
                    nonce: header.nonce,
                    hash,
                    attempts,
                    duration: start_time.elapsed(),
                    workers: 1,
                };
                log::info!(
                    "Mined block #{}: nonce {} hash {} ({} attempts, {:.1} KH/s)",
                    block.header.index,
                    result.nonce,
                    result.hash,
                    result.attempts,
                    result.hash_rate() / 1000.0
                );
                return Ok(result);
            }

            // Progress indicator
            if self.config.progress_interval > 0 && attempts % self.config.progress_interval == 0 {
                let elapsed = start_time.elapsed();
                log::debug!(
                    "Mining attempts: {} ({:.1} KH/s)",
                    attempts,
                    attempts as f64 / elapsed.as_secs_f64() / 1000.0
                );
            }

            header.nonce = header
                .nonce
                .checked_add(1)
                .ok_or(MiningError::NotFound { attempts })?;
        }
    }

    /// Verify that a mined block carries the correct hash for its header
    /// and that the hash meets the target
    pub fn verify(&self, block: &Block) -> Result<bool, MiningError> {
        let Some(stored) = &block.hash else {
            return Ok(false);
        };
        let hash = block.header.hash_with(&self.hasher)?;
        Ok(hash == *stored && self.target.is_satisfied_by(hash.as_str()))
    }

    /// Check a bare hash against the target
    pub fn verify_hash(&self, hash: &str) -> bool {
        self.target.is_satisfied_by(hash)
    }
}

/// Mining result
#[derive(Debug, Clone, Serialize)]
pub struct MiningResult {
    /// The nonce that was found
    pub nonce: u64,
    /// The resulting hash
    pub hash: HexDigest,
    /// Number of hashes computed across all workers
    pub attempts: u64,
    /// Time taken
    pub duration: Duration,
    /// Worker threads that took part
    pub workers: usize,
}

impl MiningResult {
    /// Calculate hash rate (hashes per second)
    pub fn hash_rate(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.attempts as f64 / secs
        } else {
            0.0
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::consensus::DigestError;
    use crate::core::{BlockHeader, sha256_hex};
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Digest that fails after a number of successful calls
    pub(crate) struct FailingHasher {
        remaining: AtomicU64,
    }

    impl FailingHasher {
        pub(crate) fn after(calls: u64) -> Self {
            Self {
                remaining: AtomicU64::new(calls),
            }
        }
    }

    impl HashFunction for FailingHasher {
        fn digest_hex(&self, data: &[u8]) -> Result<HexDigest, DigestError> {
            let left = self.remaining.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                n.checked_sub(1)
            });
            match left {
                Ok(_) => Ok(sha256_hex(data)),
                Err(_) => Err(DigestError::new("digest context unavailable")),
            }
        }
    }

    pub(crate) fn test_block() -> Block {
        Block::new(1, 1000, HexDigest::zero().as_str())
    }

    #[test]
    fn test_target_prefix() {
        let target = HashTarget::new(3);
        assert_eq!(target.required_prefix(), "000");
        assert_eq!(target.difficulty(), 3);
    }

    #[test]
    fn test_target_validation() {
        let target = HashTarget::new(2);
        assert!(target.is_satisfied_by("00ab"));
        assert!(target.is_satisfied_by("000f"));
        assert!(!target.is_satisfied_by("0a00"));
        assert!(!target.is_satisfied_by("a000"));
    }

    #[test]
    fn test_zero_difficulty_always_satisfied() {
        let target = HashTarget::new(0);
        assert!(target.is_satisfied_by(""));
        assert!(target.is_satisfied_by("ffff"));
    }

    #[test]
    fn test_short_hash_never_satisfies() {
        let target = HashTarget::new(65);
        assert!(!target.is_satisfied_by(HexDigest::zero().as_str()));
        assert!(!HashTarget::new(3).is_satisfied_by("00"));
    }

    #[test]
    fn test_expected_attempts() {
        assert_eq!(HashTarget::new(0).expected_attempts(), 1.0);
        assert_eq!(HashTarget::new(2).expected_attempts(), 256.0);
    }

    #[test]
    fn test_zero_difficulty_mines_nonce_zero() {
        let miner = Miner::new(0);
        let mut block = test_block();

        let result = miner.mine(&mut block).unwrap();
        assert_eq!(result.nonce, 0);
        assert_eq!(result.attempts, 1);

        let expected = sha256_hex(format!("11000{}0", HexDigest::zero()).as_bytes());
        assert_eq!(result.hash, expected);
        assert_eq!(block.hash, Some(expected));
        assert_eq!(block.header.nonce, 0);
    }

    #[test]
    fn test_mine_difficulty_one() {
        let miner = Miner::new(1);
        let mut block = test_block();

        let result = miner.mine(&mut block).unwrap();
        assert!(result.hash.as_str().starts_with('0'));

        let preimage = format!("11000{}{}", HexDigest::zero(), result.nonce);
        assert_eq!(result.hash, sha256_hex(preimage.as_bytes()));
        assert!(miner.verify(&block).unwrap());
    }

    #[test]
    fn test_mine_is_deterministic() {
        let miner = Miner::new(2);
        let mut first = test_block();
        let mut second = test_block();

        let a = miner.mine(&mut first).unwrap();
        let b = miner.mine(&mut second).unwrap();
        assert_eq!(a.nonce, b.nonce);
        assert_eq!(a.hash, b.hash);
        assert_eq!(first, second);
    }

    #[test]
    fn test_mine_restarts_from_zero() {
        let miner = Miner::new(1);
        let mut fresh = test_block();
        let mut stale = test_block();
        stale.header.nonce = 12345;

        let a = miner.mine(&mut fresh).unwrap();
        let b = miner.mine(&mut stale).unwrap();
        assert_eq!(a.nonce, b.nonce);
    }

    #[test]
    fn test_mine_attempt_budget() {
        let config = MinerConfig {
            max_attempts: Some(10),
            ..MinerConfig::default()
        };
        let miner = Miner::new(65).with_config(config);
        let mut block = test_block();

        let err = miner.mine(&mut block).unwrap_err();
        assert_eq!(err, MiningError::NotFound { attempts: 10 });
        assert!(!block.is_solved());
    }

    #[test]
    fn test_mine_digest_failure_leaves_block_untouched() {
        let miner = Miner::with_hasher(65, FailingHasher::after(5));
        let mut block = test_block();
        let before = block.clone();

        let err = miner.mine(&mut block).unwrap_err();
        assert!(matches!(err, MiningError::Digest(_)));
        assert_eq!(block, before);
    }

    #[test]
    fn test_verify_rejects_tampering() {
        let miner = Miner::new(1);
        let mut block = test_block();
        miner.mine(&mut block).unwrap();
        assert!(miner.verify(&block).unwrap());

        let mut wrong_nonce = block.clone();
        wrong_nonce.header.nonce += 1;
        assert!(!miner.verify(&wrong_nonce).unwrap());

        let mut wrong_time = block.clone();
        wrong_time.header.timestamp = 0;
        assert!(!miner.verify(&wrong_time).unwrap());

        assert!(!miner.verify(&test_block()).unwrap());
    }

    #[test]
    fn test_verify_hash() {
        let miner = Miner::new(2);
        assert!(miner.verify_hash("00ff"));
        assert!(!miner.verify_hash("0fff"));
    }

    #[test]
    fn test_verify_checks_target() {
        // Correct hash for the header, but not enough leading zeros
        let header = BlockHeader::new(1, 1000, "prev", 0);
        let hash = header.hash_with(&Sha256Hasher).unwrap();
        let block = Block {
            header,
            hash: Some(hash.clone()),
        };
        let miner = Miner::new(hash.leading_zeros() + 1);
        assert!(!miner.verify(&block).unwrap());
    }

    #[test]
    #[ignore] // Too slow for regular test runs
    fn test_pow_mining_harder() {
        let miner = Miner::new(5);
        let mut block = test_block();

        let result = miner.mine(&mut block).unwrap();
        assert!(miner.verify(&block).unwrap());
        println!("Mining took {} attempts in {:?}", result.attempts, result.duration);
    }
}
