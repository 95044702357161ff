//! Uncompressed set of blinded server points.

use crate::crypto::{BlindedPoint, POINT_SIZE};
use crate::error::{PsiError, Result};

use super::SortingPermutation;

/// A sorted list of the server's blinded points.
///
/// Membership is exact. The sort is what lets the association table pair
/// up duplicates in one pass; callers map sorted positions back to their
/// input order through the `SortingPermutation` returned by `create`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raw {
    encrypted: Vec<BlindedPoint>,
}

impl Raw {
    pub fn create(points: &[BlindedPoint]) -> (Self, SortingPermutation) {
        let permutation = SortingPermutation::sorting(points);
        let encrypted = permutation.iter().map(|&i| points[i]).collect();
        (Self { encrypted }, permutation)
    }

    /// Decode from the concatenated point encoding.
    ///
    /// # Errors
    /// Returns `PsiError::MalformedMessage` if the length is not a multiple of
    /// the point size or the points are not sorted.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % POINT_SIZE != 0 {
            return Err(PsiError::malformed(format!(
                "raw set length {} is not a multiple of {}",
                bytes.len(),
                POINT_SIZE
            )));
        }
        let encrypted = bytes
            .chunks_exact(POINT_SIZE)
            .map(BlindedPoint::from_slice)
            .collect::<Result<Vec<_>>>()?;
        if !encrypted.windows(2).all(|w| w[0] <= w[1]) {
            return Err(PsiError::malformed("raw set is not sorted"));
        }
        Ok(Self { encrypted })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.encrypted.iter().flat_map(|p| p.0).collect()
    }

    pub fn len(&self) -> usize {
        self.encrypted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encrypted.is_empty()
    }

    pub fn contains(&self, point: &BlindedPoint) -> bool {
        self.encrypted.binary_search(point).is_ok()
    }

    /// Indices into `points` that are members of the set, ascending.
    pub fn intersect(&self, points: &[BlindedPoint]) -> Vec<usize> {
        points
            .iter()
            .enumerate()
            .filter(|(_, p)| self.contains(p))
            .map(|(i, _)| i)
            .collect()
    }

    /// One `(query index, sorted position)` pair per equal element.
    pub fn associate(&self, points: &[BlindedPoint]) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (i, p) in points.iter().enumerate() {
            let start = self.encrypted.partition_point(|e| e < p);
            let end = self.encrypted.partition_point(|e| e <= p);
            pairs.extend((start..end).map(|j| (i, j)));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(b: u8) -> BlindedPoint {
        BlindedPoint([b; 32])
    }

    #[test]
    fn test_create_sorts_and_records_permutation() {
        let points = vec![pt(9), pt(3), pt(7), pt(3)];
        let (raw, perm) = Raw::create(&points);
        assert_eq!(raw.encrypted, vec![pt(3), pt(3), pt(7), pt(9)]);
        assert_eq!(perm.as_slice(), &[1, 3, 2, 0]);
        for (pos, &orig) in perm.iter().enumerate() {
            assert_eq!(raw.encrypted[pos], points[orig]);
        }
    }

    #[test]
    fn test_intersect_exact() {
        let (raw, _) = Raw::create(&[pt(1), pt(2), pt(3)]);
        assert_eq!(raw.intersect(&[pt(3), pt(4), pt(1), pt(1)]), vec![0, 2, 3]);
        assert!(raw.intersect(&[]).is_empty());
    }

    #[test]
    fn test_associate_cross_product() {
        let (raw, perm) = Raw::create(&[pt(5), pt(1), pt(5), pt(8)]);
        let mut pairs: Vec<(usize, usize)> = raw
            .associate(&[pt(5), pt(2), pt(5)])
            .into_iter()
            .map(|(c, s)| (c, perm.original_index(s).unwrap()))
            .collect();
        pairs.sort();
        assert_eq!(pairs, vec![(0, 0), (0, 2), (2, 0), (2, 2)]);
    }

    #[test]
    fn test_bytes() {
        let (raw, _) = Raw::create(&[pt(2), pt(1)]);
        let bytes = raw.to_bytes();
        assert_eq!(bytes.len(), 64);
        assert_eq!(Raw::from_bytes(&bytes).unwrap(), raw);
    }

    #[test]
    fn test_from_bytes_rejects_bad_length() {
        assert!(matches!(
            Raw::from_bytes(&[0u8; 33]),
            Err(PsiError::MalformedMessage(_))
        ));
    }

    #[test]
    fn test_from_bytes_rejects_unsorted() {
        let mut bytes = vec![2u8; 32];
        bytes.extend([1u8; 32]);
        assert!(matches!(
            Raw::from_bytes(&bytes),
            Err(PsiError::MalformedMessage(_))
        ));
    }
}
