// Multi-threaded nonce search
//
// Workers claim nonces from a shared atomic counter, hash a private copy of
// the header, and race to publish into a set-once winner slot. Publishing or
// a digest failure raises the stop flag; every worker checks it before
// claiming its next nonce.

use crate::consensus::{DigestError, Miner, MiningError, MiningResult};
use crate::core::{Block, BlockHeader, HashFunction, HexDigest};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Instant;

/// Caller-held handle to abort a running search
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask all workers to stop after their current hash
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// State shared by the workers of one search call
#[derive(Debug, Default)]
struct SearchState {
    next_nonce: AtomicU64,
    /// Set once nonce u64::MAX has been handed out
    last_claimed: AtomicBool,
    stop: AtomicBool,
    attempts: AtomicU64,
    winner: OnceLock<(u64, HexDigest)>,
    failure: OnceLock<DigestError>,
}

impl SearchState {
    /// Claim the next untested nonce, `None` once the nonce space is used up
    #[inline]
    fn claim(&self) -> Option<u64> {
        match self
            .next_nonce
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_add(1))
        {
            Ok(nonce) => Some(nonce),
            Err(_) => (!self.last_claimed.swap(true, Ordering::Relaxed)).then_some(u64::MAX),
        }
    }

    /// Record a solution; only the first caller wins.
    /// The winner is stored before the stop flag is raised.
    fn publish(&self, nonce: u64, hash: HexDigest) -> bool {
        let won = self.winner.set((nonce, hash)).is_ok();
        self.stop.store(true, Ordering::Release);
        won
    }

    fn fail(&self, err: DigestError) {
        let _ = self.failure.set(err);
        self.stop.store(true, Ordering::Release);
    }

    #[inline]
    fn should_stop(&self, cancel: Option<&CancelToken>) -> bool {
        self.stop.load(Ordering::Acquire) || cancel.is_some_and(CancelToken::is_cancelled)
    }
}

impl<H: HashFunction> Miner<H> {
    /// Mine a block on `config.workers` threads.
    ///
    /// Which valid nonce wins may vary between runs. The caller's block is
    /// written once after all workers have joined, and only on success.
    pub fn mine_parallel(
        &self,
        block: &mut Block,
        cancel: Option<&CancelToken>,
    ) -> Result<MiningResult, MiningError> {
        let workers = self.config().workers;
        if workers == 0 {
            return Err(MiningError::InvalidConfig(
                "worker count must be at least 1".to_string(),
            ));
        }

        let start_time = Instant::now();
        let header = block.header.with_nonce(0);
        let state = SearchState::default();
        let limit = self.config().max_attempts;

        log::debug!(
            "Mining {} at difficulty {} on {} workers (~{:.0} attempts expected)",
            header,
            self.target.difficulty(),
            workers,
            self.target.expected_attempts()
        );

        thread::scope(|scope| {
            for worker_id in 0..workers {
                let header = &header;
                let state = &state;
                scope.spawn(move || self.run_worker(worker_id, header, state, limit, cancel));
            }
        });

        let SearchState {
            winner,
            failure,
            attempts,
            ..
        } = state;
        let attempts = attempts.into_inner();

        if let Some((nonce, hash)) = winner.into_inner() {
            block.apply_solution(nonce, hash.clone());
            let result = MiningResult {
                nonce,
                hash,
                attempts,
                duration: start_time.elapsed(),
                workers,
            };
            log::info!(
                "Mined block #{}: nonce {} hash {} ({} attempts on {} workers, {:.1} KH/s)",
                block.header.index,
                result.nonce,
                result.hash,
                result.attempts,
                workers,
                result.hash_rate() / 1000.0
            );
            return Ok(result);
        }

        if let Some(err) = failure.into_inner() {
            log::error!("Parallel search aborted: {}", err);
            return Err(MiningError::Digest(err));
        }

        if cancel.is_some_and(CancelToken::is_cancelled) {
            log::info!("Parallel search cancelled after {} attempts", attempts);
            return Err(MiningError::Cancelled);
        }

        Err(MiningError::NotFound { attempts })
    }

    fn run_worker(
        &self,
        worker_id: usize,
        header: &BlockHeader,
        state: &SearchState,
        limit: Option<u64>,
        cancel: Option<&CancelToken>,
    ) {
        let mut candidate = header.clone();
        let mut local_attempts = 0u64;
        let progress_interval = self.config().progress_interval;

        while !state.should_stop(cancel) {
            let Some(nonce) = state.claim() else {
                break;
            };
            if limit.is_some_and(|max| nonce >= max) {
                break;
            }

            candidate.nonce = nonce;
            local_attempts += 1;

            match candidate.hash_with(self.hasher()) {
                Ok(hash) => {
                    if self.target.is_satisfied_by(hash.as_str()) {
                        if state.publish(nonce, hash) {
                            log::debug!("Worker {} found nonce {}", worker_id, nonce);
                        }
                        break;
                    }
                }
                Err(e) => {
                    log::warn!("Worker {} hit a digest failure: {}", worker_id, e);
                    state.fail(e);
                    break;
                }
            }

            if progress_interval > 0 && local_attempts % progress_interval == 0 {
                log::debug!("Worker {}: {} attempts", worker_id, local_attempts);
            }
        }

        state.attempts.fetch_add(local_attempts, Ordering::Relaxed);
    }
}
