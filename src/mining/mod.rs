//! Mining module for proof-of-work nonce search

pub mod miner;

pub use miner::{candidate_hash, CancelToken, Miner, MiningError, MiningStats, Solution};
