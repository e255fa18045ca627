//! Proof-of-work nonce search
//!
//! The miner appends a nonce to a fixed header prefix, hashes the result and
//! accepts the first candidate whose hex form starts with `difficulty` zero
//! characters. By default the search is sequential and unbounded. An attempt
//! cap, a cancellation token and a multi-threaded search can be layered on.

use crate::crypto::{meets_difficulty, sha256_hex, MAX_DIFFICULTY};
use log::debug;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Mining errors
#[derive(Error, Debug)]
pub enum MiningError {
    #[error("No nonce met the difficulty after {attempts} attempts")]
    DifficultyUnreachable { attempts: u64 },
    #[error("Mining cancelled after {attempts} attempts")]
    Cancelled { attempts: u64 },
    #[error("Failed to start mining threads: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Flag used to ask an in-progress search to stop
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal every search holding a clone of this token to stop.
    ///
    /// Once triggered the token stays set.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Mining statistics
#[derive(Debug, Clone)]
pub struct MiningStats {
    /// Number of hash attempts
    pub hash_attempts: u64,
    /// Time taken in milliseconds
    pub time_ms: u128,
    /// Hash rate (hashes per second)
    pub hash_rate: f64,
}

impl MiningStats {
    fn new(hash_attempts: u64, start: Instant) -> Self {
        let time_ms = start.elapsed().as_millis();
        let hash_rate = if time_ms > 0 {
            (hash_attempts as f64) / (time_ms as f64 / 1000.0)
        } else {
            hash_attempts as f64
        };
        Self {
            hash_attempts,
            time_ms,
            hash_rate,
        }
    }
}

/// A nonce that satisfies the difficulty, with the hash it produced
#[derive(Debug, Clone)]
pub struct Solution {
    pub nonce: u64,
    pub hash: String,
    pub stats: MiningStats,
}

/// Nonce search configuration
#[derive(Debug, Clone)]
pub struct Miner {
    /// Number of worker threads, 1 searches on the calling thread
    pub threads: usize,
    /// Only nonces below this bound are tried, `None` searches forever
    pub max_attempts: Option<u64>,
    cancel: Option<CancelToken>,
}

impl Default for Miner {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash of the header prefix followed by the decimal nonce
pub fn candidate_hash(prefix: &str, nonce: u64) -> String {
    sha256_hex(format!("{}{}", prefix, nonce).as_bytes())
}

impl Miner {
    /// Sequential, unbounded miner
    pub fn new() -> Self {
        Self {
            threads: 1,
            max_attempts: None,
            cancel: None,
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: Option<u64>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    fn within_cap(&self, nonce: u64) -> bool {
        self.max_attempts.map_or(true, |max| nonce < max)
    }

    /// Search for a nonce making `prefix ++ nonce` meet the difficulty
    pub fn search(&self, prefix: &str, difficulty: u32) -> Result<Solution, MiningError> {
        if difficulty > MAX_DIFFICULTY {
            debug!("Difficulty {} exceeds {}, not searching", difficulty, MAX_DIFFICULTY);
            return Err(MiningError::DifficultyUnreachable { attempts: 0 });
        }

        let start = Instant::now();

        let solution = if self.threads > 1 {
            self.search_parallel(prefix, difficulty, start)?
        } else {
            self.search_sequential(prefix, difficulty, start)?
        };

        debug!(
            "Found nonce {} in {}ms ({} attempts, {:.2} H/s)",
            solution.nonce,
            solution.stats.time_ms,
            solution.stats.hash_attempts,
            solution.stats.hash_rate
        );

        Ok(solution)
    }

    fn search_sequential(
        &self,
        prefix: &str,
        difficulty: u32,
        start: Instant,
    ) -> Result<Solution, MiningError> {
        let mut nonce = 0u64;

        loop {
            if self.is_cancelled() {
                return Err(MiningError::Cancelled { attempts: nonce });
            }
            if !self.within_cap(nonce) {
                return Err(MiningError::DifficultyUnreachable { attempts: nonce });
            }

            let hash = candidate_hash(prefix, nonce);
            if meets_difficulty(&hash, difficulty) {
                return Ok(Solution {
                    nonce,
                    hash,
                    stats: MiningStats::new(nonce + 1, start),
                });
            }

            nonce = nonce
                .checked_add(1)
                .ok_or(MiningError::DifficultyUnreachable { attempts: u64::MAX })?;
        }
    }

    /// Worker `k` of `T` tries nonces `k, k + T, k + 2T, ...` until any
    /// worker succeeds. The winning nonce is not necessarily the smallest.
    fn search_parallel(
        &self,
        prefix: &str,
        difficulty: u32,
        start: Instant,
    ) -> Result<Solution, MiningError> {
        let threads = self.threads as u64;
        let found = AtomicBool::new(false);
        let attempts = AtomicU64::new(0);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .build()?;

        let winner = pool.install(|| {
            (0..threads).into_par_iter().find_map_any(|worker| {
                let mut nonce = worker;
                let mut tried = 0u64;

                let result = loop {
                    if found.load(Ordering::Relaxed) || self.is_cancelled() {
                        break None;
                    }
                    if !self.within_cap(nonce) {
                        break None;
                    }

                    let hash = candidate_hash(prefix, nonce);
                    tried += 1;
                    if meets_difficulty(&hash, difficulty) {
                        found.store(true, Ordering::SeqCst);
                        break Some((nonce, hash));
                    }

                    match nonce.checked_add(threads) {
                        Some(next) => nonce = next,
                        None => break None,
                    }
                };

                debug!("Mining worker {} stopped after {} attempts", worker, tried);
                attempts.fetch_add(tried, Ordering::SeqCst);
                result
            })
        });

        let attempts = attempts.load(Ordering::SeqCst);
        match winner {
            Some((nonce, hash)) => Ok(Solution {
                nonce,
                hash,
                stats: MiningStats::new(attempts, start),
            }),
            None if self.is_cancelled() => Err(MiningError::Cancelled { attempts }),
            None => Err(MiningError::DifficultyUnreachable { attempts }),
        }
    }
}
