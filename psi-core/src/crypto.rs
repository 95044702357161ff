//! Commutative blinding over the Ristretto group.
//!
//! Blinding an element means hashing it to a group point and multiplying the
//! point by a party's secret scalar. Scalar multiplication commutes, so a
//! point blinded by the client and then by the server equals one blinded by
//! the server and then by the client. The client removes its own factor by
//! multiplying with the inverse of its scalar.

use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::Scalar;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use std::fmt;

use crate::error::{PsiError, Result};
use crate::key::PrivateKey;

/// Size in bytes of an encoded point.
pub const POINT_SIZE: usize = 32;

/// Domain separator prepended to every element before hashing to the curve.
const HASH_TO_CURVE_DOMAIN: &[u8] = b"psi-core/hash-to-ristretto255/v1";

/// A blinded group element in canonical compressed form.
///
/// Ordering is byte-wise on the encoding, which is what the sorted set
/// encodings rely on.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlindedPoint(pub [u8; POINT_SIZE]);

impl BlindedPoint {
    pub fn as_bytes(&self) -> &[u8; POINT_SIZE] {
        &self.0
    }

    /// Parse a point from a slice.
    ///
    /// # Errors
    /// Returns `PsiError::MalformedMessage` if the slice is not 32 bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; POINT_SIZE] = bytes.try_into().map_err(|_| {
            PsiError::malformed(format!(
                "point must be {} bytes, got {}",
                POINT_SIZE,
                bytes.len()
            ))
        })?;
        Ok(Self(array))
    }
}

impl AsRef<[u8]> for BlindedPoint {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for BlindedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlindedPoint(")?;
        for b in &self.0[..8] {
            write!(f, "{:02x}", b)?;
        }
        write!(f, "..)")
    }
}

/// A group in which exponentiation by secret keys commutes.
///
/// Single-element operations are required; the batch operations have
/// sequential defaults that implementations may parallelize. Every batch
/// operation returns its output in input order.
pub trait CommutativeBlinder {
    type Point: Send + Sync;

    /// Deterministically map arbitrary bytes to a group element.
    ///
    /// # Arguments
    /// * `element` - Input bytes to hash
    ///
    /// # Returns
    /// The corresponding group element
    fn hash_to_point(&self, element: &[u8]) -> Self::Point;

    /// Raise `point` to the power `scalar`.
    fn exponentiate(&self, point: &Self::Point, scalar: &Scalar) -> Self::Point;

    /// Encode a point canonically.
    fn compress(&self, point: &Self::Point) -> BlindedPoint;

    /// Decode a canonically encoded point.
    fn decompress(&self, blinded: &BlindedPoint) -> Result<Self::Point>;

    /// Blind `point` with `key`.
    fn apply_key(&self, point: &Self::Point, key: &PrivateKey) -> Self::Point {
        self.exponentiate(point, key.scalar())
    }

    /// Remove `key`'s blinding from `point`.
    fn remove_key(&self, point: &Self::Point, key: &PrivateKey) -> Self::Point {
        self.exponentiate(point, &key.inverse())
    }

    /// Hash each element to the curve and blind it with `key`.
    ///
    /// # Arguments
    /// * `elements` - Elements to blind
    /// * `key` - Blinding key
    ///
    /// # Returns
    /// Compressed blinded points, in input order
    fn hash_blind<T: AsRef<[u8]> + Sync>(&self, elements: &[T], key: &PrivateKey) -> Vec<BlindedPoint> {
        elements
            .iter()
            .map(|e| self.compress(&self.apply_key(&self.hash_to_point(e.as_ref()), key)))
            .collect()
    }

    /// Add `key`'s blinding to already-blinded points.
    fn reblind(&self, points: &[BlindedPoint], key: &PrivateKey) -> Result<Vec<BlindedPoint>> {
        points
            .iter()
            .map(|p| Ok(self.compress(&self.exponentiate(&self.decompress(p)?, key.scalar()))))
            .collect()
    }

    /// Remove `key`'s blinding from blinded points.
    ///
    /// # Arguments
    /// * `points` - Points previously blinded with `key`, possibly among others
    /// * `key` - Key whose blinding is removed
    ///
    /// # Returns
    /// The points without `key`'s factor, in input order
    fn unblind(&self, points: &[BlindedPoint], key: &PrivateKey) -> Result<Vec<BlindedPoint>> {
        let inverse = key.inverse();
        points
            .iter()
            .map(|p| Ok(self.compress(&self.exponentiate(&self.decompress(p)?, &inverse))))
            .collect()
    }
}

fn ristretto_hash(element: &[u8]) -> RistrettoPoint {
    let hasher = Sha512::new()
        .chain_update(HASH_TO_CURVE_DOMAIN)
        .chain_update(element);
    RistrettoPoint::from_hash(hasher)
}

fn ristretto_decompress(blinded: &BlindedPoint) -> Result<RistrettoPoint> {
    CompressedRistretto(blinded.0)
        .decompress()
        .ok_or_else(|| PsiError::malformed("bytes do not encode a Ristretto point"))
}

/// Sequential implementation of `CommutativeBlinder`.
///
/// All transformations are single-threaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct RistrettoSequential;

impl CommutativeBlinder for RistrettoSequential {
    type Point = RistrettoPoint;

    fn hash_to_point(&self, element: &[u8]) -> RistrettoPoint {
        ristretto_hash(element)
    }

    fn exponentiate(&self, point: &RistrettoPoint, scalar: &Scalar) -> RistrettoPoint {
        point * scalar
    }

    fn compress(&self, point: &RistrettoPoint) -> BlindedPoint {
        BlindedPoint(point.compress().to_bytes())
    }

    fn decompress(&self, blinded: &BlindedPoint) -> Result<RistrettoPoint> {
        ristretto_decompress(blinded)
    }
}

/// Parallel implementation of `CommutativeBlinder`.
///
/// Batch operations run on the rayon global pool. Elements are independent
/// and the key is shared read-only, so no synchronization is needed; the
/// indexed collect keeps outputs in input order.
#[derive(Debug, Clone, Copy, Default)]
pub struct RistrettoParallel;

impl CommutativeBlinder for RistrettoParallel {
    type Point = RistrettoPoint;

    fn hash_to_point(&self, element: &[u8]) -> RistrettoPoint {
        ristretto_hash(element)
    }

    fn exponentiate(&self, point: &RistrettoPoint, scalar: &Scalar) -> RistrettoPoint {
        point * scalar
    }

    fn compress(&self, point: &RistrettoPoint) -> BlindedPoint {
        BlindedPoint(point.compress().to_bytes())
    }

    fn decompress(&self, blinded: &BlindedPoint) -> Result<RistrettoPoint> {
        ristretto_decompress(blinded)
    }

    fn hash_blind<T: AsRef<[u8]> + Sync>(&self, elements: &[T], key: &PrivateKey) -> Vec<BlindedPoint> {
        let scalar = key.scalar();
        elements
            .par_iter()
            .map(|e| self.compress(&(ristretto_hash(e.as_ref()) * scalar)))
            .collect()
    }

    fn reblind(&self, points: &[BlindedPoint], key: &PrivateKey) -> Result<Vec<BlindedPoint>> {
        let scalar = key.scalar();
        points
            .par_iter()
            .map(|p| Ok(self.compress(&(ristretto_decompress(p)? * scalar))))
            .collect()
    }

    fn unblind(&self, points: &[BlindedPoint], key: &PrivateKey) -> Result<Vec<BlindedPoint>> {
        let inverse = key.inverse();
        let scalar: &Scalar = &inverse;
        points
            .par_iter()
            .map(|p| Ok(self.compress(&(ristretto_decompress(p)? * scalar))))
            .collect()
    }
}

/// Blinder used by the protocol parties.
#[cfg(not(target_arch = "wasm32"))]
pub type Blinder = RistrettoParallel;
#[cfg(target_arch = "wasm32")]
pub type Blinder = RistrettoSequential;
