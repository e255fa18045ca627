//! Mini-Ledger: an educational proof-of-work ledger in Rust
//!
//! This crate provides a small, self-contained blockchain featuring:
//! - SHA-256 implemented from scratch
//! - Merkle roots over transaction text, with inclusion proofs
//! - Proof of work with sequential, capped, cancellable or parallel search
//! - Textbook RSA key pairs for signing transactions (toy sizes, NOT secure)
//! - Link and full-content chain validation
//!
//! # Example
//!
//! ```rust
//! use mini_ledger::core::{Blockchain, Transaction};
//! use mini_ledger::wallet::Wallet;
//!
//! // Create a new ledger with a low difficulty
//! let mut blockchain = Blockchain::with_difficulty(1).unwrap();
//!
//! // Seal a block of plain transfers
//! blockchain
//!     .add_block(vec![Transaction::new("Alice", "Bob", 10)])
//!     .unwrap();
//!
//! // Queue a signed transfer and mine it
//! let alice = Wallet::new().unwrap();
//! let bob = Wallet::new().unwrap();
//! blockchain
//!     .add_transaction(alice.create_transaction(bob.identity(), 50))
//!     .unwrap();
//! blockchain.mine_block().unwrap();
//!
//! assert_eq!(blockchain.height(), 2);
//! assert!(blockchain.validate_chain());
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod crypto;
pub mod mining;
pub mod wallet;

// Re-export commonly used types
pub use config::{ConfigError, LedgerConfig};
pub use core::{
    Block, BlockMode, Blockchain, BlockchainError, Identity, Transaction, TransactionError,
    DEFAULT_DIFFICULTY,
};
pub use crypto::{sha256_hex, KeyPair, MerkleProof, PrivateKey, PublicKey};
pub use mining::{CancelToken, Miner, MiningStats};
pub use wallet::Wallet;
