//! Block implementation for the ledger
//!
//! A block links to its predecessor by hash and carries an ordered list of
//! transactions. Two block modes share one construction interface:
//! - [`BlockMode::Merkle`]: the transactions are summarized by a merkle root
//!   and the block hash is found by proof-of-work over
//!   `"{previous_hash}{timestamp}{merkle_root}{nonce}"`
//! - [`BlockMode::Flat`]: the block hash is the hash of the transactions'
//!   canonical text concatenated, with no merkle tree and no mining
//!
//! Blocks only exist sealed: the hash is fixed when the block is built.

use crate::core::transaction::Transaction;
use crate::crypto::{calculate_merkle_root, meets_difficulty, sha256_hex};
use crate::mining::{candidate_hash, Miner, MiningError, MiningStats};
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Previous-hash sentinel carried by every genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Block validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    #[error("Invalid proof of work")]
    InvalidProofOfWork,
    #[error("Invalid merkle root")]
    InvalidMerkleRoot,
    #[error("Invalid block hash")]
    InvalidBlockHash,
}

/// How a block commits to its transactions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockMode {
    /// Merkle-rooted, proof-of-work sealed
    #[default]
    Merkle,
    /// Hash of the concatenated transaction text
    Flat,
}

impl fmt::Display for BlockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockMode::Merkle => f.write_str("merkle"),
            BlockMode::Flat => f.write_str("flat"),
        }
    }
}

impl FromStr for BlockMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "merkle" => Ok(BlockMode::Merkle),
            "flat" => Ok(BlockMode::Flat),
            other => Err(format!("unknown block mode '{}' (expected merkle or flat)", other)),
        }
    }
}

/// Fixed-precision text of a timestamp: `"{unix_seconds}.{micros:06}"`
pub fn timestamp_text(timestamp: &DateTime<Utc>) -> String {
    format!(
        "{}.{:06}",
        timestamp.timestamp(),
        timestamp.timestamp_subsec_micros()
    )
}

/// The mining input without the nonce
pub fn header_prefix(previous_hash: &str, timestamp: &DateTime<Utc>, merkle_root: &str) -> String {
    format!("{}{}{}", previous_hash, timestamp_text(timestamp), merkle_root)
}

/// Hash of the transactions' canonical text concatenated, used by flat blocks
pub fn flat_hash(transactions: &[Transaction]) -> String {
    let data: String = transactions.iter().map(Transaction::canonical).collect();
    sha256_hex(data.as_bytes())
}

/// Merkle root over the transactions' canonical text
pub fn transactions_merkle_root(transactions: &[Transaction]) -> String {
    let leaves: Vec<String> = transactions.iter().map(Transaction::canonical).collect();
    calculate_merkle_root(&leaves)
}

/// A sealed block in the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Block index/height
    pub index: u64,
    /// How this block commits to its transactions
    pub mode: BlockMode,
    /// Hash of the previous block
    pub previous_hash: String,
    /// Block creation timestamp
    pub timestamp: DateTime<Utc>,
    /// Transactions, in the order they were given
    pub transactions: Vec<Transaction>,
    /// Merkle root of all transactions (merkle mode only)
    pub merkle_root: Option<String>,
    /// Required number of leading zero hex characters
    pub difficulty: u32,
    /// Nonce that sealed the block
    pub nonce: u64,
    /// Block hash
    pub hash: String,
}

impl Block {
    /// Build a sealed block in the given mode.
    ///
    /// Mining statistics are returned for merkle blocks only.
    pub fn build(
        mode: BlockMode,
        index: u64,
        previous_hash: String,
        transactions: Vec<Transaction>,
        difficulty: u32,
        miner: &Miner,
    ) -> Result<(Self, Option<MiningStats>), MiningError> {
        match mode {
            BlockMode::Merkle => {
                let (block, stats) =
                    Self::mine(index, previous_hash, transactions, difficulty, miner)?;
                Ok((block, Some(stats)))
            }
            BlockMode::Flat => Ok((Self::flat(index, previous_hash, transactions), None)),
        }
    }

    /// Build a merkle-rooted block and search for its nonce.
    ///
    /// Blocks the calling thread until a nonce is found, the miner's attempt
    /// cap is reached or its cancel token fires.
    pub fn mine(
        index: u64,
        previous_hash: String,
        transactions: Vec<Transaction>,
        difficulty: u32,
        miner: &Miner,
    ) -> Result<(Self, MiningStats), MiningError> {
        let timestamp = Utc::now();
        let merkle_root = transactions_merkle_root(&transactions);

        debug!("Mining block {} with difficulty {}...", index, difficulty);
        let prefix = header_prefix(&previous_hash, &timestamp, &merkle_root);
        let solution = miner.search(&prefix, difficulty)?;

        info!(
            "Block {} mined: {} ({} attempts, {}ms, {:.2} H/s)",
            index,
            solution.hash,
            solution.stats.hash_attempts,
            solution.stats.time_ms,
            solution.stats.hash_rate
        );

        let block = Self {
            index,
            mode: BlockMode::Merkle,
            previous_hash,
            timestamp,
            transactions,
            merkle_root: Some(merkle_root),
            difficulty,
            nonce: solution.nonce,
            hash: solution.hash,
        };

        Ok((block, solution.stats))
    }

    /// Build a flat block: the hash covers the transactions' text only
    pub fn flat(index: u64, previous_hash: String, transactions: Vec<Transaction>) -> Self {
        let hash = flat_hash(&transactions);
        info!("Block {} hashed: {}", index, hash);

        Self {
            index,
            mode: BlockMode::Flat,
            previous_hash,
            timestamp: Utc::now(),
            transactions,
            merkle_root: None,
            difficulty: 0,
            nonce: 0,
            hash,
        }
    }

    /// Create the genesis block
    pub fn genesis(mode: BlockMode, difficulty: u32, miner: &Miner) -> Result<Self, MiningError> {
        let (block, _) = Self::build(
            mode,
            0,
            GENESIS_PREVIOUS_HASH.to_string(),
            vec![Transaction::genesis()],
            difficulty,
            miner,
        )?;
        Ok(block)
    }

    /// Timestamp as it appears in the mining input
    pub fn timestamp_text(&self) -> String {
        timestamp_text(&self.timestamp)
    }

    /// Recompute the hash from the block's contents
    pub fn calculate_hash(&self) -> String {
        match (self.mode, &self.merkle_root) {
            (BlockMode::Merkle, Some(root)) => candidate_hash(
                &header_prefix(&self.previous_hash, &self.timestamp, root),
                self.nonce,
            ),
            (BlockMode::Merkle, None) => candidate_hash(
                &header_prefix(
                    &self.previous_hash,
                    &self.timestamp,
                    &transactions_merkle_root(&self.transactions),
                ),
                self.nonce,
            ),
            (BlockMode::Flat, _) => flat_hash(&self.transactions),
        }
    }

    /// Check if the hash carries the required zero prefix
    pub fn is_valid_pow(&self) -> bool {
        meets_difficulty(&self.hash, self.difficulty)
    }

    /// Verify the block's merkle root (flat blocks have none to check)
    pub fn verify_merkle_root(&self) -> bool {
        match (self.mode, &self.merkle_root) {
            (BlockMode::Merkle, Some(root)) => {
                *root == transactions_merkle_root(&self.transactions)
            }
            (BlockMode::Merkle, None) => false,
            (BlockMode::Flat, root) => root.is_none(),
        }
    }

    /// Verify the stored hash against the block's contents
    pub fn verify_hash(&self) -> bool {
        self.hash == self.calculate_hash()
    }

    /// Full self-consistency check (PoW + merkle + hash)
    pub fn validate(&self) -> Result<(), BlockError> {
        if !self.is_valid_pow() {
            return Err(BlockError::InvalidProofOfWork);
        }
        if !self.verify_merkle_root() {
            return Err(BlockError::InvalidMerkleRoot);
        }
        if !self.verify_hash() {
            return Err(BlockError::InvalidBlockHash);
        }
        Ok(())
    }

    /// Get number of transactions in this block
    pub fn tx_count(&self) -> usize {
        self.transactions.len()
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Hash: {}, Previous Hash: {}, Merkle Root: {}, Nonce: {}",
            self.hash,
            self.previous_hash,
            self.merkle_root.as_deref().unwrap_or("-"),
            self.nonce
        )
    }
}
