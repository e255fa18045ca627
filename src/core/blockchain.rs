//! Ledger implementation
//!
//! The main blockchain struct: an append-only chain of sealed blocks plus a
//! buffer of signed transactions waiting to be mined.

use crate::config::LedgerConfig;
use crate::core::block::{Block, BlockError, BlockMode};
use crate::core::transaction::{Transaction, TransactionError};
use crate::crypto::MAX_DIFFICULTY;
use crate::mining::{Miner, MiningError};
use log::{debug, warn};
use thiserror::Error;

/// Default mining difficulty (number of leading zero hex characters)
pub const DEFAULT_DIFFICULTY: u32 = 2;

/// Blockchain-related errors
#[derive(Error, Debug)]
pub enum BlockchainError {
    #[error("Transaction rejected: {0}")]
    Transaction(#[from] TransactionError),
    #[error("Mining failed: {0}")]
    Mining(#[from] MiningError),
    #[error("Invalid block {index}: {source}")]
    InvalidBlock {
        index: usize,
        #[source]
        source: BlockError,
    },
    #[error("Block {index} does not link to the hash of its predecessor")]
    BrokenLink { index: usize },
    #[error("Difficulty {0} is unreachable: a hash has only 64 hex characters")]
    DifficultyOutOfRange(u32),
}

/// The main blockchain structure
#[derive(Debug, Clone)]
pub struct Blockchain {
    /// The chain of blocks, genesis first
    blocks: Vec<Block>,
    /// Verified transactions waiting for the next mined block
    pending_transactions: Vec<Transaction>,
    /// Mining difficulty for new blocks
    difficulty: u32,
    /// How new blocks commit to their transactions
    mode: BlockMode,
    miner: Miner,
}

impl Blockchain {
    /// Create a new blockchain with default settings
    pub fn new() -> Result<Self, BlockchainError> {
        Self::with_config(&LedgerConfig::default())
    }

    /// Create a merkle-mode blockchain with custom difficulty
    pub fn with_difficulty(difficulty: u32) -> Result<Self, BlockchainError> {
        Self::with_miner(BlockMode::Merkle, difficulty, Miner::new())
    }

    /// Create a blockchain from configuration
    pub fn with_config(config: &LedgerConfig) -> Result<Self, BlockchainError> {
        Self::with_miner(config.block_mode, config.difficulty, config.miner())
    }

    /// Create a blockchain with an explicit miner
    pub fn with_miner(
        mode: BlockMode,
        difficulty: u32,
        miner: Miner,
    ) -> Result<Self, BlockchainError> {
        if difficulty > MAX_DIFFICULTY {
            return Err(BlockchainError::DifficultyOutOfRange(difficulty));
        }

        let genesis = Self::create_genesis_block(mode, difficulty, &miner)?;
        Ok(Self {
            blocks: vec![genesis],
            pending_transactions: Vec::new(),
            difficulty,
            mode,
            miner,
        })
    }

    fn create_genesis_block(
        mode: BlockMode,
        difficulty: u32,
        miner: &Miner,
    ) -> Result<Block, BlockchainError> {
        let genesis = Block::genesis(mode, difficulty, miner)?;
        debug!("Created {} genesis block {}", mode, genesis.hash);
        Ok(genesis)
    }

    /// All blocks, genesis first
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Get the latest block
    pub fn latest_block(&self) -> &Block {
        // `blocks` always holds the genesis block
        &self.blocks[self.blocks.len() - 1]
    }

    /// Get blockchain height
    pub fn height(&self) -> u64 {
        self.blocks.len() as u64 - 1
    }

    pub fn pending_transactions(&self) -> &[Transaction] {
        &self.pending_transactions
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn mode(&self) -> BlockMode {
        self.mode
    }

    /// Seal a block over `transactions` on top of the current tail
    pub fn add_block(&mut self, transactions: Vec<Transaction>) -> Result<&Block, BlockchainError> {
        let (block, _) = Block::build(
            self.mode,
            self.height() + 1,
            self.latest_block().hash.clone(),
            transactions,
            self.difficulty,
            &self.miner,
        )?;

        self.blocks.push(block);
        Ok(self.latest_block())
    }

    /// Verify a transaction's signature and queue it for mining.
    ///
    /// A rejected transaction leaves the pending buffer untouched.
    pub fn add_transaction(&mut self, transaction: Transaction) -> Result<(), BlockchainError> {
        if let Err(e) = transaction.verify_signature() {
            warn!("Rejected transaction {}: {}", transaction, e);
            return Err(e.into());
        }

        debug!("Queued transaction {}", transaction);
        self.pending_transactions.push(transaction);
        Ok(())
    }

    /// Seal the pending transactions into a new block.
    ///
    /// The block is built from a snapshot of the buffer and only the
    /// snapshotted transactions are removed once it is appended.
    pub fn mine_block(&mut self) -> Result<&Block, BlockchainError> {
        let snapshot = self.pending_transactions.clone();
        let included = snapshot.len();

        self.add_block(snapshot)?;
        self.pending_transactions.drain(..included);

        Ok(self.latest_block())
    }

    /// Index of the first block whose previous hash does not match its
    /// predecessor's hash
    pub fn find_broken_link(&self) -> Option<usize> {
        self.blocks
            .windows(2)
            .position(|pair| pair[1].previous_hash != pair[0].hash)
            .map(|i| i + 1)
    }

    /// Check previous-hash linkage across the whole chain.
    ///
    /// Merkle roots and proof of work are not re-checked, see [`Self::audit`].
    pub fn validate_chain(&self) -> bool {
        match self.find_broken_link() {
            Some(index) => {
                warn!("Chain link broken at block {}", index);
                false
            }
            None => true,
        }
    }

    /// Validate the entire chain: every block's contents and every link
    pub fn audit(&self) -> Result<(), BlockchainError> {
        for (index, block) in self.blocks.iter().enumerate() {
            block
                .validate()
                .map_err(|source| BlockchainError::InvalidBlock { index, source })?;

            if index > 0 && block.previous_hash != self.blocks[index - 1].hash {
                return Err(BlockchainError::BrokenLink { index });
            }
        }
        Ok(())
    }

    /// Get chain statistics
    pub fn stats(&self) -> ChainStats {
        ChainStats {
            height: self.height(),
            total_blocks: self.blocks.len() as u64,
            total_transactions: self.blocks.iter().map(|b| b.tx_count() as u64).sum(),
            pending_transactions: self.pending_transactions.len() as u64,
            difficulty: self.difficulty,
            mode: self.mode,
            latest_hash: self.latest_block().hash.clone(),
        }
    }
}

/// Chain statistics
#[derive(Debug, Clone)]
pub struct ChainStats {
    pub height: u64,
    pub total_blocks: u64,
    pub total_transactions: u64,
    pub pending_transactions: u64,
    pub difficulty: u32,
    pub mode: BlockMode,
    pub latest_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::block::GENESIS_PREVIOUS_HASH;
    use crate::crypto::KeyPair;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn key_pair(seed: u64) -> KeyPair {
        KeyPair::generate_with(&mut StdRng::seed_from_u64(seed), None).unwrap()
    }

    fn three_block_chain(mode: BlockMode) -> Blockchain {
        let mut blockchain = Blockchain::with_miner(mode, 1, Miner::new()).unwrap();
        blockchain
            .add_block(vec![Transaction::new("Alice", "Bob", 5)])
            .unwrap();
        blockchain
            .add_block(vec![Transaction::new("Bob", "Carol", 2)])
            .unwrap();
        blockchain
    }

    #[test]
    fn test_new_blockchain() {
        let blockchain = Blockchain::with_difficulty(1).unwrap();
        assert_eq!(blockchain.blocks().len(), 1);
        assert_eq!(blockchain.height(), 0);

        let genesis = blockchain.latest_block();
        assert_eq!(genesis.previous_hash, GENESIS_PREVIOUS_HASH);
        assert_eq!(genesis.transactions.len(), 1);
        assert_eq!(genesis.transactions[0].amount, 0);
        assert!(blockchain.validate_chain());
        assert!(blockchain.audit().is_ok());
    }

    #[test]
    fn test_unreachable_difficulty_rejected() {
        for mode in [BlockMode::Merkle, BlockMode::Flat] {
            let err = Blockchain::with_miner(mode, MAX_DIFFICULTY + 1, Miner::new()).unwrap_err();
            assert!(matches!(err, BlockchainError::DifficultyOutOfRange(65)));
        }
        assert!(matches!(
            Blockchain::with_difficulty(u32::MAX),
            Err(BlockchainError::DifficultyOutOfRange(u32::MAX))
        ));
    }

    #[test]
    fn test_add_block_links_to_tail() {
        let mut blockchain = Blockchain::with_difficulty(2).unwrap();
        let genesis_hash = blockchain.latest_block().hash.clone();

        let block = blockchain
            .add_block(vec![Transaction::new("A", "B", 1)])
            .unwrap();

        assert_eq!(block.index, 1);
        assert_eq!(block.previous_hash, genesis_hash);
        assert!(block.hash.starts_with("00"));
    }

    #[test]
    fn test_chain_validation() {
        for mode in [BlockMode::Merkle, BlockMode::Flat] {
            let blockchain = three_block_chain(mode);
            assert_eq!(blockchain.height(), 2);
            assert!(blockchain.validate_chain());
            assert_eq!(blockchain.find_broken_link(), None);
            assert!(blockchain.audit().is_ok());
        }
    }

    #[test]
    fn test_tampered_previous_hash_breaks_chain() {
        let mut blockchain = three_block_chain(BlockMode::Merkle);
        blockchain.blocks[1].previous_hash = "tampered".to_string();

        assert!(!blockchain.validate_chain());
        assert_eq!(blockchain.find_broken_link(), Some(1));
        assert!(blockchain.audit().is_err());
    }

    #[test]
    fn test_tampered_hash_breaks_next_link() {
        let mut blockchain = three_block_chain(BlockMode::Merkle);
        blockchain.blocks[1].hash = "0".repeat(64);

        assert_eq!(blockchain.find_broken_link(), Some(2));
        assert!(matches!(
            blockchain.audit(),
            Err(BlockchainError::InvalidBlock { index: 1, .. })
        ));
    }

    #[test]
    fn test_audit_catches_tampered_transactions() {
        let mut blockchain = three_block_chain(BlockMode::Merkle);
        blockchain.blocks[2].transactions[0].amount = 500;

        // Link walk alone does not notice
        assert!(blockchain.validate_chain());
        assert!(matches!(
            blockchain.audit(),
            Err(BlockchainError::InvalidBlock {
                index: 2,
                source: BlockError::InvalidMerkleRoot
            })
        ));
    }

    #[test]
    fn test_add_transaction_and_mine() {
        let mut blockchain = Blockchain::with_difficulty(1).unwrap();
        let alice = key_pair(1);
        let bob = key_pair(2);

        let tx = Transaction::signed(&alice, bob.public_key, 50);
        blockchain.add_transaction(tx.clone()).unwrap();
        assert_eq!(blockchain.pending_transactions().len(), 1);

        let block = blockchain.mine_block().unwrap();
        assert_eq!(block.transactions, vec![tx]);
        assert!(blockchain.pending_transactions().is_empty());
        assert_eq!(blockchain.height(), 1);
        assert!(blockchain.validate_chain());
    }

    #[test]
    fn test_invalid_signature_rejected() {
        let mut blockchain = Blockchain::with_difficulty(1).unwrap();
        let alice = key_pair(1);

        let mut tx = Transaction::signed(&alice, "bob", 50);
        tx.amount = 5_000;

        let err = blockchain.add_transaction(tx).unwrap_err();
        assert!(matches!(
            err,
            BlockchainError::Transaction(TransactionError::SignatureInvalid)
        ));
        assert!(blockchain.pending_transactions().is_empty());
    }

    #[test]
    fn test_flat_mine_block_hashes_pending_text() {
        let mut blockchain = Blockchain::with_miner(BlockMode::Flat, 2, Miner::new()).unwrap();
        let alice = key_pair(4);
        let tx = Transaction::signed(&alice, "bob", 7);
        blockchain.add_transaction(tx.clone()).unwrap();

        let block = blockchain.mine_block().unwrap();
        assert_eq!(
            block.hash,
            crate::crypto::sha256_hex(tx.canonical().as_bytes())
        );
        assert_eq!(block.merkle_root, None);
    }

    #[test]
    fn test_mining_cap_leaves_state_untouched() {
        let mut blockchain = Blockchain::with_difficulty(0).unwrap();
        blockchain.difficulty = 64;
        blockchain.miner = Miner::new().with_max_attempts(Some(5));

        let alice = key_pair(1);
        blockchain
            .add_transaction(Transaction::signed(&alice, "bob", 1))
            .unwrap();

        let err = blockchain.mine_block().unwrap_err();
        assert!(matches!(
            err,
            BlockchainError::Mining(MiningError::DifficultyUnreachable { attempts: 5 })
        ));
        assert_eq!(blockchain.height(), 0);
        assert_eq!(blockchain.pending_transactions().len(), 1);
    }

    #[test]
    fn test_stats() {
        let blockchain = three_block_chain(BlockMode::Merkle);
        let stats = blockchain.stats();
        assert_eq!(stats.height, 2);
        assert_eq!(stats.total_blocks, 3);
        assert_eq!(stats.total_transactions, 3);
        assert_eq!(stats.pending_transactions, 0);
        assert_eq!(stats.latest_hash, blockchain.latest_block().hash);
    }
}
