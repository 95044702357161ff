//! Error types for the PSI engine.

use thiserror::Error;

/// Errors that can occur during PSI protocol execution.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PsiError {
    /// Key bytes were not exactly the size of a scalar.
    #[error("Invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// Key bytes decoded to a scalar that cannot be used for blinding.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// False-positive rate outside the open interval (0, 1).
    #[error("False positive rate must be in (0, 1), got {0}")]
    InvalidFalsePositiveRate(f64),

    /// Unknown data structure kind, or an operation the kind cannot support.
    #[error("Unsupported data structure: {0}")]
    UnsupportedDataStructure(String),

    /// A setup, request or response message failed to decode or validate.
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// Per-element matches were requested on a size-only session.
    #[error("Intersection is not revealable: session only reveals the intersection size")]
    IntersectionNotRevealable,

    /// Client and server were configured with different reveal modes.
    #[error("Reveal mode mismatch: local reveal_intersection = {local}, remote = {remote}")]
    IntersectionModeMismatch { local: bool, remote: bool },
}

impl PsiError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        PsiError::MalformedMessage(msg.into())
    }
}

/// Result type for PSI operations.
pub type Result<T> = std::result::Result<T, PsiError>;
