//! Setup configuration.
//!
//! Reveal mode is not here: it is fixed per client or server instance when
//! the party is created.

use serde::{Deserialize, Serialize};

use crate::datastructure::DataStructure;
use crate::error::{PsiError, Result};

/// False positive rate used when a config does not set one.
pub const DEFAULT_FALSE_POSITIVE_RATE: f64 = 1e-6;

/// Check that `fpr` lies in the open interval `(0, 1)`.
pub fn validate_fpr(fpr: f64) -> Result<f64> {
    if fpr > 0.0 && fpr < 1.0 {
        Ok(fpr)
    } else {
        Err(PsiError::InvalidFalsePositiveRate(fpr))
    }
}

/// Normalize a client size hint: zero means unknown.
pub fn effective_hint(hint: Option<usize>) -> Option<usize> {
    hint.filter(|&n| n > 0)
}

/// Per-element rate that keeps the expected number of false positives over
/// the whole client set at `fpr`.
///
/// When the client set size is unknown the server set size is used instead.
pub fn per_element_fpr(fpr: f64, hint: Option<usize>, num_server_elements: usize) -> f64 {
    let n = effective_hint(hint).unwrap_or(num_server_elements).max(1);
    fpr / n as f64
}

/// Server-side parameters for building a setup message.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetupConfig {
    /// Expected false positives over the whole client set, in `(0, 1)`.
    pub false_positive_rate: f64,
    /// Client set size, if known. `None` or `Some(0)` means unknown.
    pub num_client_elements_hint: Option<usize>,
    pub data_structure: DataStructure,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            false_positive_rate: DEFAULT_FALSE_POSITIVE_RATE,
            num_client_elements_hint: None,
            data_structure: DataStructure::default(),
        }
    }
}

impl SetupConfig {
    pub fn new(false_positive_rate: f64, data_structure: DataStructure) -> Self {
        Self {
            false_positive_rate,
            num_client_elements_hint: None,
            data_structure,
        }
    }

    pub fn with_client_elements_hint(mut self, num_client_elements: usize) -> Self {
        self.num_client_elements_hint = Some(num_client_elements);
        self
    }

    /// # Errors
    /// Returns `PsiError::InvalidFalsePositiveRate` if the data structure is
    /// compact and the rate is outside `(0, 1)`.
    pub fn validate(&self) -> Result<()> {
        if self.data_structure.is_compact() {
            validate_fpr(self.false_positive_rate)?;
        }
        Ok(())
    }
}
