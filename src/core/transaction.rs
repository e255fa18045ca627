//! Transaction handling for the ledger
//!
//! A transaction moves `amount` from a sender to a receiver. Either party is
//! an [`Identity`]: a plain label or a public key. Signed transactions carry
//! one signature element per character of the signing document
//! `"{receiver}{amount}"`.

use crate::crypto::{KeyPair, PublicKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Label used for both parties of the genesis transaction
pub const GENESIS_LABEL: &str = "Genesis";

/// Transaction-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("Signature is wrong")]
    SignatureInvalid,
    #[error("Transaction is not signed")]
    MissingSignature,
    #[error("Sender {0} is not a public key")]
    SenderNotAKey(String),
}

/// A party to a transaction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Identity {
    /// Plain string label (unsigned ledger entries)
    Label(String),
    /// Public key (signed ledger entries)
    Key(PublicKey),
}

impl Identity {
    /// The public key behind this identity, if any
    pub fn public_key(&self) -> Option<&PublicKey> {
        match self {
            Identity::Key(key) => Some(key),
            Identity::Label(_) => None,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Label(label) => f.write_str(label),
            Identity::Key(key) => write!(f, "{}", key),
        }
    }
}

impl From<&str> for Identity {
    fn from(label: &str) -> Self {
        Identity::Label(label.to_string())
    }
}

impl From<String> for Identity {
    fn from(label: String) -> Self {
        Identity::Label(label)
    }
}

impl From<PublicKey> for Identity {
    fn from(key: PublicKey) -> Self {
        Identity::Key(key)
    }
}

/// An immutable transfer record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: Identity,
    pub receiver: Identity,
    pub amount: u64,
    /// One element per signed character, absent for unsigned entries
    pub signature: Option<Vec<u64>>,
}

impl Transaction {
    /// Create an unsigned transaction
    pub fn new(sender: impl Into<Identity>, receiver: impl Into<Identity>, amount: u64) -> Self {
        Self {
            sender: sender.into(),
            receiver: receiver.into(),
            amount,
            signature: None,
        }
    }

    /// Create a transaction sent and signed by `key_pair`
    pub fn signed(key_pair: &KeyPair, receiver: impl Into<Identity>, amount: u64) -> Self {
        let receiver = receiver.into();
        let signature = key_pair.sign(&signing_document(&receiver, amount));
        Self {
            sender: Identity::Key(key_pair.public_key),
            receiver,
            amount,
            signature: Some(signature),
        }
    }

    /// The placeholder transaction carried by a genesis block
    pub fn genesis() -> Self {
        Self::new(GENESIS_LABEL, GENESIS_LABEL, 0)
    }

    /// The text the sender signs
    pub fn signing_document(&self) -> String {
        signing_document(&self.receiver, self.amount)
    }

    /// Canonical form used for hashing: `"{sender}->{receiver}:{amount}"`
    pub fn canonical(&self) -> String {
        self.to_string()
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// Verify the signature against the sender's public key
    pub fn verify_signature(&self) -> Result<(), TransactionError> {
        let key = self
            .sender
            .public_key()
            .ok_or_else(|| TransactionError::SenderNotAKey(self.sender.to_string()))?;
        let signature = self
            .signature
            .as_deref()
            .ok_or(TransactionError::MissingSignature)?;

        if key.verify(&self.signing_document(), signature) {
            Ok(())
        } else {
            Err(TransactionError::SignatureInvalid)
        }
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}:{}", self.sender, self.receiver, self.amount)
    }
}

/// Build the signing document `"{receiver}{amount}"`
pub fn signing_document(receiver: &Identity, amount: u64) -> String {
    format!("{}{}", receiver, amount)
}
