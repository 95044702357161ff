//! Per-party session state.

use crate::crypto::Blinder;
use crate::error::{PsiError, Result};
use crate::key::{PrivateKey, KEY_SIZE};

/// State shared by both protocol roles.
///
/// A `Session` holds the party's private key and its reveal mode. Both are
/// fixed at creation: a session that was created size-only can never be
/// asked for per-element matches. Nothing in a session is mutated after
/// construction, so it can be shared freely across threads.
#[derive(Debug, Clone)]
pub(crate) struct Session {
    pub(crate) key: PrivateKey,
    pub(crate) reveal_intersection: bool,
    pub(crate) blinder: Blinder,
}

impl Session {
    /// Create a session with a fresh random key.
    pub(crate) fn with_new_key(reveal_intersection: bool) -> Self {
        Self::with_key(PrivateKey::generate(), reveal_intersection)
    }

    /// Create a session from exported key bytes.
    ///
    /// # Errors
    /// Returns `PsiError::InvalidKeyLength` or `PsiError::InvalidKey` if the
    /// bytes are not a usable key.
    pub(crate) fn from_key_bytes(key_bytes: &[u8], reveal_intersection: bool) -> Result<Self> {
        Ok(Self::with_key(PrivateKey::from_bytes(key_bytes)?, reveal_intersection))
    }

    pub(crate) fn with_key(key: PrivateKey, reveal_intersection: bool) -> Self {
        Self {
            key,
            reveal_intersection,
            blinder: Blinder::default(),
        }
    }

    pub(crate) fn reveal_intersection(&self) -> bool {
        self.reveal_intersection
    }

    pub(crate) fn private_key_bytes(&self) -> [u8; KEY_SIZE] {
        self.key.to_bytes()
    }

    /// Fail unless the session reveals per-element matches.
    pub(crate) fn require_reveal(&self) -> Result<()> {
        if self.reveal_intersection {
            Ok(())
        } else {
            Err(PsiError::IntersectionNotRevealable)
        }
    }

    /// Fail unless the peer's reveal mode matches ours.
    pub(crate) fn require_mode(&self, remote: bool) -> Result<()> {
        if self.reveal_intersection == remote {
            Ok(())
        } else {
            Err(PsiError::IntersectionModeMismatch {
                local: self.reveal_intersection,
                remote,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_new_key() {
        let session = Session::with_new_key(true);
        assert!(session.reveal_intersection());
        assert!(session.require_reveal().is_ok());
    }

    #[test]
    fn test_session_from_key_bytes() {
        let bytes: Vec<u8> = (1u8..=32).collect();
        let session = Session::from_key_bytes(&bytes, false).unwrap();
        assert_eq!(session.private_key_bytes().to_vec(), bytes);
        assert_eq!(session.require_reveal(), Err(PsiError::IntersectionNotRevealable));
    }

    #[test]
    fn test_session_with_key() {
        let key = PrivateKey::generate();
        let bytes = key.to_bytes();
        let session = Session::with_key(key, true);
        assert_eq!(session.private_key_bytes(), bytes);
        assert!(session.require_mode(true).is_ok());
    }

    #[test]
    fn test_session_from_bad_key_bytes() {
        assert!(matches!(
            Session::from_key_bytes(&[7u8; 16], true),
            Err(PsiError::InvalidKeyLength { .. })
        ));
    }

    #[test]
    fn test_require_mode() {
        let session = Session::with_new_key(false);
        assert!(session.require_mode(false).is_ok());
        assert_eq!(
            session.require_mode(true),
            Err(PsiError::IntersectionModeMismatch {
                local: false,
                remote: true
            })
        );
    }
}
