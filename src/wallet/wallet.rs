//! Wallet implementation for the ledger
//!
//! Holds a key pair and creates signed transactions.

use crate::core::{Identity, Transaction};
use crate::crypto::{KeyPair, PublicKey};
use rand::Rng;
use thiserror::Error;

/// Wallet-related errors
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Crypto error: {0}")]
    CryptoError(#[from] crate::crypto::KeyError),
}

/// A ledger wallet for managing keys and creating transactions
pub struct Wallet {
    /// The key pair for signing transactions
    key_pair: KeyPair,
}

impl Wallet {
    /// Create a new wallet with a fresh key pair
    pub fn new() -> Result<Self, WalletError> {
        Ok(Self::from_key_pair(KeyPair::generate()?))
    }

    /// Create a wallet from a caller-supplied RNG, bounding key generation
    pub fn generate_with<R: Rng + ?Sized>(
        rng: &mut R,
        max_attempts: Option<u64>,
    ) -> Result<Self, WalletError> {
        Ok(Self::from_key_pair(KeyPair::generate_with(rng, max_attempts)?))
    }

    /// Wrap an existing key pair
    pub fn from_key_pair(key_pair: KeyPair) -> Self {
        Self { key_pair }
    }

    /// Get the wallet's public key
    pub fn public_key(&self) -> PublicKey {
        self.key_pair.public_key
    }

    /// The identity other parties use to pay this wallet
    pub fn identity(&self) -> Identity {
        Identity::Key(self.public_key())
    }

    /// Create a transaction signed with this wallet's private key
    pub fn create_transaction(&self, receiver: impl Into<Identity>, amount: u64) -> Transaction {
        Transaction::signed(&self.key_pair, receiver, amount)
    }

    /// Decrypt a message encrypted to this wallet's public key
    pub fn decrypt(&self, ciphertext: &[u64]) -> Result<String, WalletError> {
        Ok(self.key_pair.private_key.decrypt(ciphertext)?)
    }
}
