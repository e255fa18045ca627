//! Textbook RSA key management for the ledger
//!
//! Key pairs are built from two random three-digit primes, so `n` is at
//! most about a million. This is a teaching scheme and is NOT secure:
//! - every character is exponentiated on its own, with no padding
//! - signing is "decryption" with the private exponent over raw code points
//! - a code point `>= n` wraps modulo `n` and does not round-trip
//!
//! The smallest possible modulus is `101 * 103`, so every byte value and
//! most of the Basic Multilingual Plane is below `n`.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Inclusive range primes are sampled from
pub const PRIME_RANGE: std::ops::RangeInclusive<u64> = 100..=999;

/// Errors that can occur during key operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("Key generation gave up after {attempts} attempts while sampling {stage}")]
    GenerationFailed { stage: &'static str, attempts: u64 },
    #[error("{value} has no inverse modulo {modulus}")]
    NoModularInverse { value: u64, modulus: u64 },
    #[error("Decrypted value {0} is not a valid character")]
    InvalidCodePoint(u64),
}

/// Public half of a key pair: `(e, n)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey {
    pub e: u64,
    pub n: u64,
}

/// Private half of a key pair: `(d, n)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateKey {
    pub d: u64,
    pub n: u64,
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.e, self.n)
    }
}

impl PublicKey {
    /// Encrypt each character as `ord(c)^e mod n`
    pub fn encrypt(&self, plaintext: &str) -> Vec<u64> {
        apply(plaintext, self.e, self.n)
    }

    /// Check a signature by raising each element to `e` and comparing the
    /// reassembled text with the document
    pub fn verify(&self, document: &str, signature: &[u64]) -> bool {
        if signature.len() != document.chars().count() {
            return false;
        }
        match recover(signature, self.e, self.n) {
            Ok(text) => text == document,
            Err(_) => false,
        }
    }
}

impl PrivateKey {
    /// Decrypt each element as `chr(c^d mod n)`
    pub fn decrypt(&self, ciphertext: &[u64]) -> Result<String, KeyError> {
        recover(ciphertext, self.d, self.n)
    }

    /// Sign a document as `ord(c)^d mod n` per character
    pub fn sign(&self, document: &str) -> Vec<u64> {
        apply(document, self.d, self.n)
    }
}

/// A key pair consisting of a private key and its corresponding public key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPair {
    pub public_key: PublicKey,
    pub private_key: PrivateKey,
}

impl KeyPair {
    /// Generate a new random key pair, retrying until it succeeds
    pub fn generate() -> Result<Self, KeyError> {
        Self::generate_with(&mut rand::thread_rng(), None)
    }

    /// Generate a key pair from the given RNG.
    ///
    /// `max_attempts` bounds each rejection-sampling loop (each prime and the
    /// public exponent). `None` retries forever.
    pub fn generate_with<R: Rng + ?Sized>(
        rng: &mut R,
        max_attempts: Option<u64>,
    ) -> Result<Self, KeyError> {
        let p = generate_prime(rng, max_attempts)?;
        let q = sample_until(max_attempts, "a second distinct prime", || {
            let candidate = rng.gen_range(PRIME_RANGE);
            (candidate != p && is_prime(candidate)).then_some(candidate)
        })?;

        let n = p * q;
        let phi = (p - 1) * (q - 1);

        let e = sample_until(max_attempts, "the public exponent", || {
            let candidate = rng.gen_range(2..phi);
            (gcd(candidate, phi) == 1).then_some(candidate)
        })?;
        let d = mod_inverse(e, phi).ok_or(KeyError::NoModularInverse {
            value: e,
            modulus: phi,
        })?;

        Ok(Self {
            public_key: PublicKey { e, n },
            private_key: PrivateKey { d, n },
        })
    }

    /// Sign a document with this pair's private key
    pub fn sign(&self, document: &str) -> Vec<u64> {
        self.private_key.sign(document)
    }

    /// Verify a signature with this pair's public key
    pub fn verify(&self, document: &str, signature: &[u64]) -> bool {
        self.public_key.verify(document, signature)
    }
}

/// Repeat `sample` until it yields a value or the attempt cap is reached
fn sample_until<T>(
    max_attempts: Option<u64>,
    stage: &'static str,
    mut sample: impl FnMut() -> Option<T>,
) -> Result<T, KeyError> {
    let mut attempts = 0u64;
    loop {
        if let Some(limit) = max_attempts {
            if attempts >= limit {
                return Err(KeyError::GenerationFailed { stage, attempts });
            }
        }
        attempts += 1;
        if let Some(value) = sample() {
            return Ok(value);
        }
    }
}

/// Sample a random prime from [`PRIME_RANGE`]
pub fn generate_prime<R: Rng + ?Sized>(
    rng: &mut R,
    max_attempts: Option<u64>,
) -> Result<u64, KeyError> {
    sample_until(max_attempts, "a prime", || {
        let candidate = rng.gen_range(PRIME_RANGE);
        is_prime(candidate).then_some(candidate)
    })
}

/// Primality by trial division up to `floor(sqrt(n))`
pub fn is_prime(n: u64) -> bool {
    if n <= 1 {
        return false;
    }
    let mut i = 2u64;
    while i * i <= n {
        if n % i == 0 {
            return false;
        }
        i += 1;
    }
    true
}

/// Greatest common divisor
pub fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Modular multiplicative inverse via the extended Euclidean algorithm
pub fn mod_inverse(value: u64, modulus: u64) -> Option<u64> {
    if modulus == 0 {
        return None;
    }
    let m = modulus as i128;
    let (mut old_r, mut r) = ((value % modulus) as i128, m);
    let (mut old_s, mut s) = (1i128, 0i128);

    while r != 0 {
        let quotient = old_r / r;
        (old_r, r) = (r, old_r - quotient * r);
        (old_s, s) = (s, old_s - quotient * s);
    }

    if old_r != 1 {
        return None;
    }
    Some(old_s.rem_euclid(m) as u64)
}

/// Modular exponentiation by repeated squaring
pub fn mod_pow(base: u64, mut exponent: u64, modulus: u64) -> u64 {
    if modulus == 1 {
        return 0;
    }
    let m = modulus as u128;
    let mut result = 1u128;
    let mut base = base as u128 % m;

    while exponent > 0 {
        if exponent & 1 == 1 {
            result = result * base % m;
        }
        base = base * base % m;
        exponent >>= 1;
    }

    result as u64
}

fn apply(text: &str, exponent: u64, modulus: u64) -> Vec<u64> {
    text.chars()
        .map(|c| mod_pow(c as u64, exponent, modulus))
        .collect()
}

fn recover(values: &[u64], exponent: u64, modulus: u64) -> Result<String, KeyError> {
    values
        .iter()
        .map(|&value| {
            let code = mod_pow(value, exponent, modulus);
            u32::try_from(code)
                .ok()
                .and_then(char::from_u32)
                .ok_or(KeyError::InvalidCodePoint(code))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn seeded_pair(seed: u64) -> KeyPair {
        KeyPair::generate_with(&mut StdRng::seed_from_u64(seed), None).unwrap()
    }

    #[test]
    fn test_is_prime() {
        assert!(!is_prime(0));
        assert!(!is_prime(1));
        assert!(is_prime(2));
        assert!(is_prime(101));
        assert!(is_prime(997));
        assert!(!is_prime(999));
        assert!(!is_prime(961)); // 31 * 31
    }

    #[test]
    fn test_mod_inverse() {
        assert_eq!(mod_inverse(3, 11), Some(4));
        assert_eq!(mod_inverse(17, 3120), Some(2753));
        assert_eq!(mod_inverse(6, 9), None);
    }

    #[test]
    fn test_mod_pow() {
        assert_eq!(mod_pow(4, 13, 497), 445);
        assert_eq!(mod_pow(65, 17, 3233), 2790);
        assert_eq!(mod_pow(2790, 2753, 3233), 65);
        assert_eq!(mod_pow(5, 0, 7), 1);
    }

    #[test]
    fn test_key_pair_generation() {
        for seed in 0..20 {
            let kp = seeded_pair(seed);
            let PublicKey { e, n } = kp.public_key;
            assert_eq!(n, kp.private_key.n);
            assert!(n >= 101 * 103);
            assert!(e >= 2);
        }
    }

    #[test]
    fn test_generation_is_reproducible_with_seed() {
        assert_eq!(seeded_pair(7), seeded_pair(7));
    }

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let kp = seeded_pair(42);
        for text in ["A", "hello", "~", "é", "Жж"] {
            let ciphertext = kp.public_key.encrypt(text);
            assert_eq!(ciphertext.len(), text.chars().count());
            assert_eq!(kp.private_key.decrypt(&ciphertext).unwrap(), text);
        }
    }

    #[test]
    fn test_round_trip_every_byte_value() {
        let kp = seeded_pair(3);
        for value in 0u32..256 {
            let c = char::from_u32(value).unwrap();
            let text = c.to_string();
            let ciphertext = kp.public_key.encrypt(&text);
            assert_eq!(kp.private_key.decrypt(&ciphertext).unwrap(), text);
        }
    }

    #[test]
    fn test_sign_and_verify() {
        let kp = seeded_pair(11);
        let document = "(17, 3233)50";
        let signature = kp.sign(document);

        assert!(kp.verify(document, &signature));
        assert!(!kp.verify("(17, 3233)51", &signature));
    }

    #[test]
    fn test_verify_with_other_key_fails() {
        let alice = seeded_pair(1);
        let bob = seeded_pair(2);
        let signature = alice.sign("bob100");
        assert!(!bob.verify("bob100", &signature));
    }

    #[test]
    fn test_verify_rejects_length_mismatch() {
        let kp = seeded_pair(5);
        let mut signature = kp.sign("abc");
        signature.pop();
        assert!(!kp.verify("abc", &signature));
    }

    #[test]
    fn test_generation_cap() {
        let err = KeyPair::generate_with(&mut StdRng::seed_from_u64(9), Some(0)).unwrap_err();
        assert!(matches!(err, KeyError::GenerationFailed { attempts: 0, .. }));
    }

    #[test]
    fn test_public_key_display() {
        let key = PublicKey { e: 17, n: 3233 };
        assert_eq!(key.to_string(), "(17, 3233)");
    }
}
