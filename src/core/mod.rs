//! Core ledger components
//!
//! This module contains the fundamental building blocks:
//! - Transactions (labelled or key-signed transfers)
//! - Blocks (merkle-rooted with proof of work, or flat)
//! - Blockchain (append-only chain with a pending transaction buffer)

pub mod block;
pub mod blockchain;
pub mod transaction;

pub use block::{
    flat_hash, header_prefix, timestamp_text, transactions_merkle_root, Block, BlockError,
    BlockMode, GENESIS_PREVIOUS_HASH,
};
pub use blockchain::{Blockchain, BlockchainError, ChainStats, DEFAULT_DIFFICULTY};
pub use transaction::{signing_document, Identity, Transaction, TransactionError, GENESIS_LABEL};
