//! Cryptographic hashing for the ledger
//!
//! A self-contained SHA-256 (FIPS 180-4) used for block hashes, merkle
//! roots and transaction leaves. Output is always rendered as 64 lowercase
//! hex characters.

/// Size of a digest in bytes
pub const DIGEST_SIZE: usize = 32;

/// Largest difficulty a hex digest can satisfy
pub const MAX_DIFFICULTY: u32 = (DIGEST_SIZE * 2) as u32;

/// Size of one compression block in bytes
const BLOCK_SIZE: usize = 64;

/// Round constants: first 32 bits of the fractional parts of the cube roots
/// of the first 64 primes.
static K: [u32; 64] = [
    0x428a2f98, 0x71374491, 0xb5c0fbcf, 0xe9b5dba5, 0x3956c25b, 0x59f111f1, 0x923f82a4, 0xab1c5ed5,
    0xd807aa98, 0x12835b01, 0x243185be, 0x550c7dc3, 0x72be5d74, 0x80deb1fe, 0x9bdc06a7, 0xc19bf174,
    0xe49b69c1, 0xefbe4786, 0x0fc19dc6, 0x240ca1cc, 0x2de92c6f, 0x4a7484aa, 0x5cb0a9dc, 0x76f988da,
    0x983e5152, 0xa831c66d, 0xb00327c8, 0xbf597fc7, 0xc6e00bf3, 0xd5a79147, 0x06ca6351, 0x14292967,
    0x27b70a85, 0x2e1b2138, 0x4d2c6dfc, 0x53380d13, 0x650a7354, 0x766a0abb, 0x81c2c92e, 0x92722c85,
    0xa2bfe8a1, 0xa81a664b, 0xc24b8b70, 0xc76c51a3, 0xd192e819, 0xd6990624, 0xf40e3585, 0x106aa070,
    0x19a4c116, 0x1e376c08, 0x2748774c, 0x34b0bcb5, 0x391c0cb3, 0x4ed8aa4a, 0x5b9cca4f, 0x682e6ff3,
    0x748f82ee, 0x78a5636f, 0x84c87814, 0x8cc70208, 0x90befffa, 0xa4506ceb, 0xbef9a3f7, 0xc67178f2,
];

/// Initial hash state: first 32 bits of the fractional parts of the square
/// roots of the first 8 primes.
const H0: [u32; 8] = [
    0x6a09e667, 0xbb67ae85, 0x3c6ef372, 0xa54ff53a, 0x510e527f, 0x9b05688c, 0x1f83d9ab, 0x5be0cd19,
];

/// Pad a message to a multiple of 64 bytes.
///
/// Appends `0x80`, then zeros until the length is 56 mod 64, then the
/// original length in bits as a big-endian u64.
fn pad(data: &[u8]) -> Vec<u8> {
    let bit_len = (data.len() as u64).wrapping_mul(8);

    let mut message = Vec::with_capacity(data.len() + BLOCK_SIZE + 8);
    message.extend_from_slice(data);
    message.push(0x80);
    while message.len() % BLOCK_SIZE != 56 {
        message.push(0x00);
    }
    message.extend_from_slice(&bit_len.to_be_bytes());
    message
}

#[inline]
fn small_sigma0(x: u32) -> u32 {
    x.rotate_right(7) ^ x.rotate_right(18) ^ (x >> 3)
}

#[inline]
fn small_sigma1(x: u32) -> u32 {
    x.rotate_right(17) ^ x.rotate_right(19) ^ (x >> 10)
}

#[inline]
fn big_sigma0(x: u32) -> u32 {
    x.rotate_right(2) ^ x.rotate_right(13) ^ x.rotate_right(22)
}

#[inline]
fn big_sigma1(x: u32) -> u32 {
    x.rotate_right(6) ^ x.rotate_right(11) ^ x.rotate_right(25)
}

#[inline]
fn choose(e: u32, f: u32, g: u32) -> u32 {
    (e & f) ^ (!e & g)
}

#[inline]
fn majority(a: u32, b: u32, c: u32) -> u32 {
    (a & b) ^ (a & c) ^ (b & c)
}

/// Run the compression function over one 64-byte block.
fn compress(state: &mut [u32; 8], block: &[u8]) {
    let mut w = [0u32; 64];
    for (word, bytes) in w.iter_mut().zip(block.chunks_exact(4)) {
        *word = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    }
    for j in 16..64 {
        w[j] = w[j - 16]
            .wrapping_add(small_sigma0(w[j - 15]))
            .wrapping_add(w[j - 7])
            .wrapping_add(small_sigma1(w[j - 2]));
    }

    let [mut a, mut b, mut c, mut d, mut e, mut f, mut g, mut h] = *state;

    for j in 0..64 {
        let temp1 = h
            .wrapping_add(big_sigma1(e))
            .wrapping_add(choose(e, f, g))
            .wrapping_add(K[j])
            .wrapping_add(w[j]);
        let temp2 = big_sigma0(a).wrapping_add(majority(a, b, c));

        h = g;
        g = f;
        f = e;
        e = d.wrapping_add(temp1);
        d = c;
        c = b;
        b = a;
        a = temp1.wrapping_add(temp2);
    }

    for (word, value) in state.iter_mut().zip([a, b, c, d, e, f, g, h]) {
        *word = word.wrapping_add(value);
    }
}

/// Computes the SHA-256 digest of the input data
pub fn sha256(data: &[u8]) -> [u8; DIGEST_SIZE] {
    let mut state = H0;
    for block in pad(data).chunks_exact(BLOCK_SIZE) {
        compress(&mut state, block);
    }

    let mut digest = [0u8; DIGEST_SIZE];
    for (out, word) in digest.chunks_exact_mut(4).zip(state) {
        out.copy_from_slice(&word.to_be_bytes());
    }
    digest
}

/// Computes SHA-256 and returns it as a 64-character lowercase hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Checks whether a hex hash starts with `difficulty` literal `'0'` characters
pub fn meets_difficulty(hash_hex: &str, difficulty: u32) -> bool {
    let required = difficulty as usize;
    hash_hex.len() >= required && hash_hex.bytes().take(required).all(|c| c == b'0')
}
