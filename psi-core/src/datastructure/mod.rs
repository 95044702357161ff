//! Encodings of the server's blinded set.
//!
//! The server sends its blinded points to the client in one of three forms:
//!
//! - [`Raw`]: the sorted points themselves. Exact, largest.
//! - [`BloomFilter`]: a bit array. Probabilistic, keeps no element positions.
//! - [`Gcs`]: a Golomb-Compressed Set. Probabilistic, smaller than a Bloom
//!   filter at the same rate, decoded by a single sorted scan.
//!
//! [`EncodedSet`] dispatches on the kind; each variant owns its decode state.

use std::fmt;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::validate_fpr;
use crate::crypto::BlindedPoint;
use crate::error::{PsiError, Result};

mod bloom_filter;
mod gcs;
mod golomb;
mod raw;

pub use bloom_filter::BloomFilter;
pub use gcs::Gcs;
pub use raw::Raw;

/// Kind of set encoding carried by a setup message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DataStructure {
    Raw,
    #[default]
    Gcs,
    BloomFilter,
}

impl DataStructure {
    /// Whether the encoding is probabilistic and sized by a false positive rate.
    pub fn is_compact(&self) -> bool {
        !matches!(self, DataStructure::Raw)
    }
}

impl From<DataStructure> for u8 {
    fn from(kind: DataStructure) -> u8 {
        match kind {
            DataStructure::Raw => 0,
            DataStructure::Gcs => 1,
            DataStructure::BloomFilter => 2,
        }
    }
}

impl TryFrom<u8> for DataStructure {
    type Error = PsiError;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(DataStructure::Raw),
            1 => Ok(DataStructure::Gcs),
            2 => Ok(DataStructure::BloomFilter),
            other => Err(PsiError::UnsupportedDataStructure(format!("tag {}", other))),
        }
    }
}

impl FromStr for DataStructure {
    type Err = PsiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "raw" => Ok(DataStructure::Raw),
            "gcs" => Ok(DataStructure::Gcs),
            "bloomfilter" | "bloom_filter" | "bloom" => Ok(DataStructure::BloomFilter),
            _ => Err(PsiError::UnsupportedDataStructure(s.to_string())),
        }
    }
}

impl fmt::Display for DataStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataStructure::Raw => "Raw",
            DataStructure::Gcs => "GCS",
            DataStructure::BloomFilter => "BloomFilter",
        };
        f.write_str(name)
    }
}

/// Maps each position of a sorted encoding back to the index of the input
/// element stored there.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>")]
pub struct SortingPermutation(Vec<usize>);

impl SortingPermutation {
    /// Stable sort of `0..keys.len()` by key.
    pub(crate) fn sorting<K: Ord>(keys: &[K]) -> Self {
        let mut order: Vec<usize> = (0..keys.len()).collect();
        order.sort_by(|&a, &b| keys[a].cmp(&keys[b]));
        Self(order)
    }

    /// Rebuild a permutation a caller stored earlier.
    ///
    /// # Errors
    /// Returns `PsiError::MalformedMessage` unless `order` contains each of
    /// `0..order.len()` exactly once.
    pub fn from_vec(order: Vec<usize>) -> Result<Self> {
        let mut seen = vec![false; order.len()];
        for &i in &order {
            match seen.get_mut(i) {
                Some(s) if !*s => *s = true,
                _ => {
                    return Err(PsiError::malformed(format!(
                        "index {} repeated or out of range in sorting permutation",
                        i
                    )))
                }
            }
        }
        Ok(Self(order))
    }

    /// Original input index of the element at sorted position `position`.
    pub fn original_index(&self, position: usize) -> Option<usize> {
        self.0.get(position).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, usize> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<usize> {
        self.0
    }
}

impl TryFrom<Vec<usize>> for SortingPermutation {
    type Error = PsiError;

    fn try_from(order: Vec<usize>) -> Result<Self> {
        Self::from_vec(order)
    }
}

/// A decoded server set, ready for membership queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedSet {
    Raw(Raw),
    Gcs(Gcs),
    BloomFilter(BloomFilter),
}

impl EncodedSet {
    /// Encode `points` as `kind`, sized for per-element false positive rate `fpr`.
    ///
    /// Returns the sorting permutation for the kinds that sort (Raw and GCS).
    ///
    /// # Errors
    /// Returns `PsiError::InvalidFalsePositiveRate` if `kind` is compact and
    /// `fpr` is outside `(0, 1)`. Raw ignores `fpr`.
    pub fn encode(
        kind: DataStructure,
        points: &[BlindedPoint],
        fpr: f64,
    ) -> Result<(Self, Option<SortingPermutation>)> {
        if kind.is_compact() {
            validate_fpr(fpr)?;
        }
        let encoded = match kind {
            DataStructure::Raw => {
                let (raw, perm) = Raw::create(points);
                (EncodedSet::Raw(raw), Some(perm))
            }
            DataStructure::Gcs => {
                let (gcs, perm) = Gcs::create(points, fpr);
                debug!(
                    "GCS: {} elements, hash range {}, rice parameter {}",
                    gcs.len(),
                    gcs.hash_range(),
                    gcs.rice_parameter()
                );
                (EncodedSet::Gcs(gcs), Some(perm))
            }
            DataStructure::BloomFilter => {
                let mut filter = BloomFilter::with_false_positive_prob(fpr, points.len());
                for p in points {
                    filter.insert(p);
                }
                debug!(
                    "Bloom filter: {} bits, {} hashes",
                    filter.num_bits(),
                    filter.num_hashes()
                );
                (EncodedSet::BloomFilter(filter), None)
            }
        };
        Ok(encoded)
    }

    /// # Errors
    /// Returns `PsiError::MalformedMessage` if `bytes` is not a valid encoding
    /// of `kind`.
    pub fn decode(kind: DataStructure, bytes: &[u8]) -> Result<Self> {
        Ok(match kind {
            DataStructure::Raw => EncodedSet::Raw(Raw::from_bytes(bytes)?),
            DataStructure::Gcs => EncodedSet::Gcs(Gcs::from_bytes(bytes)?),
            DataStructure::BloomFilter => EncodedSet::BloomFilter(BloomFilter::from_bytes(bytes)?),
        })
    }

    pub fn kind(&self) -> DataStructure {
        match self {
            EncodedSet::Raw(_) => DataStructure::Raw,
            EncodedSet::Gcs(_) => DataStructure::Gcs,
            EncodedSet::BloomFilter(_) => DataStructure::BloomFilter,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            EncodedSet::Raw(raw) => raw.to_bytes(),
            EncodedSet::Gcs(gcs) => gcs.to_bytes(),
            EncodedSet::BloomFilter(filter) => filter.to_bytes(),
        }
    }

    /// Number of encoded server elements, if the encoding keeps it.
    pub fn num_elements(&self) -> Option<usize> {
        match self {
            EncodedSet::Raw(raw) => Some(raw.len()),
            EncodedSet::Gcs(gcs) => Some(gcs.len()),
            EncodedSet::BloomFilter(_) => None,
        }
    }

    /// Indices into `points` that test as members, ascending.
    pub fn intersect(&self, points: &[BlindedPoint]) -> Vec<usize> {
        match self {
            EncodedSet::Raw(raw) => raw.intersect(points),
            EncodedSet::Gcs(gcs) => gcs.intersect(points),
            EncodedSet::BloomFilter(filter) => points
                .iter()
                .enumerate()
                .filter(|(_, p)| filter.contains(p))
                .map(|(i, _)| i)
                .collect(),
        }
    }

    /// `(query index, sorted server position)` for every match.
    ///
    /// # Errors
    /// Returns `PsiError::UnsupportedDataStructure` for a Bloom filter, which
    /// does not retain element positions.
    pub fn associate(&self, points: &[BlindedPoint]) -> Result<Vec<(usize, usize)>> {
        match self {
            EncodedSet::Raw(raw) => Ok(raw.associate(points)),
            EncodedSet::Gcs(gcs) => Ok(gcs.associate(points)),
            EncodedSet::BloomFilter(_) => Err(PsiError::UnsupportedDataStructure(
                "BloomFilter cannot produce an association table".to_string(),
            )),
        }
    }
}
