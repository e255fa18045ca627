//! Cryptographic utilities for the ledger
//!
//! This module provides:
//! - SHA-256 hashing, implemented from scratch
//! - Textbook RSA key pairs (toy sizes, not secure)
//! - Merkle tree calculations

pub mod hash;
pub mod keys;
pub mod merkle;

pub use hash::{meets_difficulty, sha256, sha256_hex, DIGEST_SIZE, MAX_DIFFICULTY};
pub use keys::{
    gcd, generate_prime, is_prime, mod_inverse, mod_pow, KeyError, KeyPair, PrivateKey,
    PublicKey, PRIME_RANGE,
};
pub use merkle::{
    calculate_merkle_root, calculate_merkle_root_from_hashes, leaf_hashes, MerkleProof,
    EMPTY_ROOT_SENTINEL,
};
