//! Bloom filter over blinded points.

use sha2::{Digest, Sha256};

use crate::error::{PsiError, Result};

const HEADER_SIZE: usize = 4 + 8;

/// Upper bound on hash functions, reached at rates below `2^-64`.
pub const MAX_NUM_HASHES: u32 = 64;

/// Bit-array membership structure. Never returns false for an inserted
/// value; returns true for other values with probability close to the rate
/// it was sized for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BloomFilter {
    bits: Vec<u8>,
    num_bits: u64,
    num_hashes: u32,
}

impl BloomFilter {
    /// Create an empty filter with `num_bits` bits and `num_hashes` hash functions.
    pub fn new(num_bits: u64, num_hashes: u32) -> Self {
        let num_bits = num_bits.max(1);
        Self {
            bits: vec![0u8; num_bits.div_ceil(8) as usize],
            num_bits,
            num_hashes: num_hashes.clamp(1, MAX_NUM_HASHES),
        }
    }

    /// Number of hash functions for false positive probability `p`, at most
    /// `MAX_NUM_HASHES`.
    pub fn compute_nhashes(p: f64) -> u32 {
        ((-p.log2()).ceil() as u32).clamp(1, MAX_NUM_HASHES)
    }

    /// Number of bits needed to hold `n` insertions at false positive
    /// probability `p`.
    pub fn compute_num_bits(p: f64, n: usize) -> u64 {
        ((-1.44 * p.log2() * n as f64).ceil() as u64).max(1)
    }

    /// Create a filter with false positive probability `p` which can hold up
    /// to `n` insertions.
    pub fn with_false_positive_prob(p: f64, n: usize) -> Self {
        Self::new(Self::compute_num_bits(p, n), Self::compute_nhashes(p))
    }

    pub fn num_bits(&self) -> u64 {
        self.num_bits
    }

    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    /// Bit position of `value` for hash function `hash_index`.
    fn bin<V: AsRef<[u8]>>(&self, value: &V, hash_index: u32) -> u64 {
        let digest = Sha256::new()
            .chain_update((hash_index as u64).to_le_bytes())
            .chain_update(value)
            .finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        u64::from_le_bytes(head) % self.num_bits
    }

    fn bit(&self, i: u64) -> bool {
        self.bits[(i / 8) as usize] & (1 << (i % 8)) != 0
    }

    pub fn insert<V: AsRef<[u8]>>(&mut self, value: &V) {
        for hash_index in 0..self.num_hashes {
            let i = self.bin(value, hash_index);
            self.bits[(i / 8) as usize] |= 1 << (i % 8);
        }
    }

    pub fn contains<V: AsRef<[u8]>>(&self, value: &V) -> bool {
        (0..self.num_hashes).all(|hash_index| self.bit(self.bin(value, hash_index)))
    }

    /// `num_hashes: u32 LE | num_bits: u64 LE | bits`, bits packed LSB first.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE + self.bits.len());
        out.extend_from_slice(&self.num_hashes.to_le_bytes());
        out.extend_from_slice(&self.num_bits.to_le_bytes());
        out.extend_from_slice(&self.bits);
        out
    }

    /// # Errors
    /// Returns `PsiError::MalformedMessage` for a short header, zero sizes, too
    /// many hash functions, or a bit array whose length disagrees with the
    /// header.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(PsiError::malformed("bloom filter header truncated"));
        }
        let (header, bits) = bytes.split_at(HEADER_SIZE);
        let mut nh = [0u8; 4];
        nh.copy_from_slice(&header[..4]);
        let mut nb = [0u8; 8];
        nb.copy_from_slice(&header[4..]);
        let num_hashes = u32::from_le_bytes(nh);
        let num_bits = u64::from_le_bytes(nb);

        if num_hashes == 0 || num_bits == 0 {
            return Err(PsiError::malformed("bloom filter has zero size"));
        }
        if num_hashes > MAX_NUM_HASHES {
            return Err(PsiError::malformed(format!(
                "bloom filter declares {} hash functions, at most {} allowed",
                num_hashes, MAX_NUM_HASHES
            )));
        }
        if num_bits.div_ceil(8) != bits.len() as u64 {
            return Err(PsiError::malformed(format!(
                "bloom filter declares {} bits but carries {} bytes",
                num_bits,
                bits.len()
            )));
        }
        Ok(Self {
            bits: bits.to_vec(),
            num_bits,
            num_hashes,
        })
    }
}
