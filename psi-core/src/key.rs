//! Private key management.

use std::fmt;

use curve25519_dalek::Scalar;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::error::{PsiError, Result};

/// Size in bytes of an encoded private key.
pub const KEY_SIZE: usize = 32;

/// A party's secret blinding key: a scalar of the Ristretto255 group.
///
/// Imported bytes are reduced modulo the group order for arithmetic, but the
/// exact imported bytes are retained so that `to_bytes` returns what was
/// given to `from_bytes`. Both copies are wiped on drop.
#[derive(Clone)]
pub struct PrivateKey {
    scalar: Zeroizing<Scalar>,
    bytes: Zeroizing<[u8; KEY_SIZE]>,
}

impl PrivateKey {
    /// Generate a fresh key from the operating system's CSPRNG.
    pub fn generate() -> Self {
        let mut rng = OsRng;
        loop {
            let scalar = Scalar::random(&mut rng);
            if scalar != Scalar::ZERO {
                return Self {
                    bytes: Zeroizing::new(scalar.to_bytes()),
                    scalar: Zeroizing::new(scalar),
                };
            }
        }
    }

    /// Import a key from its 32-byte encoding.
    ///
    /// # Errors
    /// - `PsiError::InvalidKeyLength` if `bytes` is not exactly 32 bytes long
    /// - `PsiError::InvalidKey` if the bytes reduce to the zero scalar
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let array: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| PsiError::InvalidKeyLength {
            expected: KEY_SIZE,
            actual: bytes.len(),
        })?;
        let scalar = Scalar::from_bytes_mod_order(array);
        if scalar == Scalar::ZERO {
            return Err(PsiError::InvalidKey(
                "key reduces to the zero scalar".to_string(),
            ));
        }
        Ok(Self {
            scalar: Zeroizing::new(scalar),
            bytes: Zeroizing::new(array),
        })
    }

    /// Export the key bytes.
    pub fn to_bytes(&self) -> [u8; KEY_SIZE] {
        *self.bytes
    }

    pub(crate) fn scalar(&self) -> &Scalar {
        &self.scalar
    }

    /// Modular inverse of the key scalar, used to remove this key's blinding.
    pub(crate) fn inverse(&self) -> Zeroizing<Scalar> {
        Zeroizing::new(self.scalar.invert())
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        *self.scalar == *other.scalar
    }
}

impl Eq for PrivateKey {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_keys_differ() {
        let a = PrivateKey::generate();
        let b = PrivateKey::generate();
        // With overwhelming probability, two random keys should be different
        assert_ne!(a, b);
        assert_ne!(*a.scalar(), Scalar::ZERO);
    }

    #[test]
    fn test_round_trip_generated() {
        let key = PrivateKey::generate();
        let imported = PrivateKey::from_bytes(&key.to_bytes()).unwrap();
        assert_eq!(key, imported);
        assert_eq!(key.to_bytes(), imported.to_bytes());
    }

    #[test]
    fn test_round_trip_non_canonical_bytes() {
        // Top byte 31 exceeds the group order, so the scalar is reduced
        // but the exported bytes must still be the imported ones.
        let bytes: Vec<u8> = (0u8..32).collect();
        let key = PrivateKey::from_bytes(&bytes).unwrap();
        assert_eq!(key.to_bytes().to_vec(), bytes);
    }

    #[test]
    fn test_invalid_length() {
        assert_eq!(
            PrivateKey::from_bytes(&[1u8; 31]).unwrap_err(),
            PsiError::InvalidKeyLength {
                expected: 32,
                actual: 31
            }
        );
        assert!(matches!(
            PrivateKey::from_bytes(&[1u8; 33]),
            Err(PsiError::InvalidKeyLength { actual: 33, .. })
        ));
        assert!(matches!(
            PrivateKey::from_bytes(&[]),
            Err(PsiError::InvalidKeyLength { actual: 0, .. })
        ));
    }

    #[test]
    fn test_zero_key_rejected() {
        assert!(matches!(
            PrivateKey::from_bytes(&[0u8; 32]),
            Err(PsiError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_inverse() {
        let key = PrivateKey::generate();
        assert_eq!(key.scalar() * &*key.inverse(), Scalar::ONE);
    }

    #[test]
    fn test_debug_redacted() {
        let key = PrivateKey::generate();
        assert_eq!(format!("{:?}", key), "PrivateKey(<redacted>)");
    }
}
