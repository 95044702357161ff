//! Golomb-Compressed Set over blinded points.

use sha2::{Digest, Sha256};

use crate::crypto::BlindedPoint;
use crate::error::{PsiError, Result};

use super::golomb::{self, MAX_RICE_PARAMETER};
use super::SortingPermutation;

const HEADER_SIZE: usize = 8 + 8 + 1;
const MAX_HASH_RANGE: u64 = 1 << 62;

/// Points hashed into `[0, hash_range)`, sorted, and Rice-coded as gaps.
///
/// With `n` elements and `hash_range = n / p` a non-member collides with
/// some member with probability about `p`. Duplicate hashes are kept as
/// zero gaps so sorted positions line up with the `SortingPermutation`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gcs {
    hash_range: u64,
    rice_parameter: u8,
    hashes: Vec<u64>,
    encoded: Vec<u8>,
}

/// Hash a point uniformly into `[0, range)`.
fn hash_to_range(point: &BlindedPoint, range: u64) -> u64 {
    let digest = Sha256::new()
        .chain_update(b"gcs")
        .chain_update(point)
        .finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    ((u64::from_le_bytes(head) as u128 * range as u128) >> 64) as u64
}

impl Gcs {
    /// Hash range for `n` elements at per-element false positive probability `p`.
    pub fn compute_hash_range(p: f64, n: usize) -> u64 {
        let range = (n as f64 / p).ceil();
        if range >= MAX_HASH_RANGE as f64 {
            MAX_HASH_RANGE
        } else {
            (range as u64).max(1)
        }
    }

    /// Rice parameter for false positive probability `p`.
    pub fn compute_rice_parameter(p: f64) -> u8 {
        ((1.0 / p).log2().floor().max(0.0) as u8).min(MAX_RICE_PARAMETER)
    }

    pub fn create(points: &[BlindedPoint], p: f64) -> (Self, SortingPermutation) {
        let hash_range = Self::compute_hash_range(p, points.len());
        let rice_parameter = Self::compute_rice_parameter(p);

        let unsorted: Vec<u64> = points.iter().map(|pt| hash_to_range(pt, hash_range)).collect();
        let permutation = SortingPermutation::sorting(&unsorted);
        let hashes: Vec<u64> = permutation.iter().map(|&i| unsorted[i]).collect();
        let encoded = golomb::encode(&hashes, rice_parameter);

        (
            Self {
                hash_range,
                rice_parameter,
                hashes,
                encoded,
            },
            permutation,
        )
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    pub fn hash_range(&self) -> u64 {
        self.hash_range
    }

    pub fn rice_parameter(&self) -> u8 {
        self.rice_parameter
    }

    /// `num_elements: u64 LE | hash_range: u64 LE | rice_parameter: u8 | stream`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE + self.encoded.len());
        out.extend_from_slice(&(self.hashes.len() as u64).to_le_bytes());
        out.extend_from_slice(&self.hash_range.to_le_bytes());
        out.push(self.rice_parameter);
        out.extend_from_slice(&self.encoded);
        out
    }

    /// Decodes the whole stream up front so later lookups cannot fail.
    ///
    /// # Errors
    /// Returns `PsiError::MalformedMessage` for a truncated header or stream,
    /// trailing data after the last value, or values outside the declared
    /// hash range.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(PsiError::malformed("GCS header truncated"));
        }
        let mut word = [0u8; 8];
        word.copy_from_slice(&bytes[..8]);
        let num_elements = u64::from_le_bytes(word);
        word.copy_from_slice(&bytes[8..16]);
        let hash_range = u64::from_le_bytes(word);
        let rice_parameter = bytes[16];
        let encoded = &bytes[HEADER_SIZE..];

        if hash_range == 0 || hash_range > MAX_HASH_RANGE {
            return Err(PsiError::malformed(format!("GCS hash range {} invalid", hash_range)));
        }
        let count = usize::try_from(num_elements)
            .map_err(|_| PsiError::malformed("GCS element count too large"))?;
        let hashes = golomb::decode(encoded, count, rice_parameter)?;
        if hashes.last().map_or(false, |&h| h >= hash_range) {
            return Err(PsiError::malformed("GCS value outside hash range"));
        }

        Ok(Self {
            hash_range,
            rice_parameter,
            hashes,
            encoded: encoded.to_vec(),
        })
    }

    /// Client hashes paired with their index, sorted by hash.
    fn sorted_queries(&self, points: &[BlindedPoint]) -> Vec<(u64, usize)> {
        let mut queries: Vec<(u64, usize)> = points
            .iter()
            .enumerate()
            .map(|(i, p)| (hash_to_range(p, self.hash_range), i))
            .collect();
        queries.sort_unstable();
        queries
    }

    /// Indices into `points` whose hash appears in the set, ascending.
    pub fn intersect(&self, points: &[BlindedPoint]) -> Vec<usize> {
        let mut result = Vec::new();
        let mut j = 0;
        for (h, i) in self.sorted_queries(points) {
            while j < self.hashes.len() && self.hashes[j] < h {
                j += 1;
            }
            if j < self.hashes.len() && self.hashes[j] == h {
                result.push(i);
            }
        }
        result.sort_unstable();
        result
    }

    /// One `(query index, sorted position)` pair per equal hash.
    pub fn associate(&self, points: &[BlindedPoint]) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        let mut start = 0;
        for (h, i) in self.sorted_queries(points) {
            while start < self.hashes.len() && self.hashes[start] < h {
                start += 1;
            }
            let mut end = start;
            while end < self.hashes.len() && self.hashes[end] == h {
                pairs.push((i, end));
                end += 1;
            }
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;

    fn random_points(n: usize) -> Vec<BlindedPoint> {
        let mut rng = rand::thread_rng();
        (0..n)
            .map(|_| {
                let mut v = [0u8; 32];
                rng.fill_bytes(&mut v);
                BlindedPoint(v)
            })
            .collect()
    }

    #[test]
    fn test_parameters() {
        assert_eq!(Gcs::compute_rice_parameter(0.01), 6);
        assert_eq!(Gcs::compute_rice_parameter(0.9), 0);
        assert_eq!(Gcs::compute_hash_range(0.5, 10), 20);
        assert_eq!(Gcs::compute_hash_range(0.5, 0), 1);
        assert_eq!(Gcs::compute_hash_range(1e-30, 1000), MAX_HASH_RANGE);
    }

    #[test]
    fn test_no_false_negatives() {
        let points = random_points(500);
        let (gcs, _) = Gcs::create(&points, 0.001);
        assert_eq!(gcs.intersect(&points), (0..500).collect::<Vec<_>>());
    }

    #[test]
    fn test_permutation_maps_positions() {
        let points = random_points(64);
        let (gcs, perm) = Gcs::create(&points, 0.0001);
        for (pos, &orig) in perm.iter().enumerate() {
            assert_eq!(gcs.hashes[pos], hash_to_range(&points[orig], gcs.hash_range));
        }
    }

    #[test]
    fn test_associate_duplicates() {
        let points = random_points(3);
        let server = vec![points[0], points[1], points[0]];
        let (gcs, perm) = Gcs::create(&server, 0.0001);
        let mut pairs: Vec<(usize, usize)> = gcs
            .associate(&[points[0], points[2], points[0]])
            .into_iter()
            .map(|(c, s)| (c, perm.original_index(s).unwrap()))
            .collect();
        pairs.sort();
        assert_eq!(pairs, vec![(0, 0), (0, 2), (2, 0), (2, 2)]);
    }

    #[test]
    fn test_bytes() {
        let (gcs, _) = Gcs::create(&random_points(100), 0.01);
        let decoded = Gcs::from_bytes(&gcs.to_bytes()).unwrap();
        assert_eq!(decoded, gcs);
    }

    #[test]
    fn test_smaller_than_bloom_filter() {
        let points = random_points(1000);
        let p = 0.001;
        let (gcs, _) = Gcs::create(&points, p);
        let bloom_bits = super::super::BloomFilter::compute_num_bits(p, points.len());
        assert!((gcs.to_bytes().len() as u64) * 8 < bloom_bits);
    }

    #[test]
    fn test_false_positive_rate() {
        let p = 0.01;
        let (gcs, _) = Gcs::create(&random_points(1000), p);
        let trials = 20_000;
        let hits = gcs.intersect(&random_points(trials)).len();
        assert!(hits < (3.0 * p * trials as f64) as usize, "hits = {}", hits);
    }

    #[test]
    fn test_from_bytes_rejects_malformed() {
        assert!(Gcs::from_bytes(&[0u8; 10]).is_err());

        let (gcs, _) = Gcs::create(&random_points(20), 0.01);
        let mut bytes = gcs.to_bytes();
        bytes.truncate(HEADER_SIZE + 1);
        assert!(matches!(Gcs::from_bytes(&bytes), Err(PsiError::MalformedMessage(_))));

        let mut padded = gcs.to_bytes();
        padded.extend([0xAB; 64]);
        assert!(matches!(Gcs::from_bytes(&padded), Err(PsiError::MalformedMessage(_))));

        let mut zero_range = gcs.to_bytes();
        zero_range[8..16].copy_from_slice(&0u64.to_le_bytes());
        assert!(Gcs::from_bytes(&zero_range).is_err());
    }
}
