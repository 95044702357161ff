//! Message types exchanged between the PSI client and server.
//!
//! Messages are plain structs with serde derives; callers may use any serde
//! format. [`WireMessage`] offers a bincode encoding for callers that just
//! need bytes. Whatever format is used must preserve the order of the point
//! sequences, since results are recovered by index.

use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::validate_fpr;
use crate::crypto::BlindedPoint;
use crate::datastructure::{DataStructure, EncodedSet, SortingPermutation};
use crate::error::{PsiError, Result};

/// Byte encoding of a protocol message.
pub trait WireMessage: Serialize + DeserializeOwned {
    /// Encode the message with bincode.
    fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| PsiError::malformed(format!("encode failed: {}", e)))
    }

    /// Decode a message produced by `to_bytes`.
    ///
    /// # Errors
    /// Returns `PsiError::MalformedMessage` if the bytes are truncated or
    /// do not describe this message type.
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| PsiError::malformed(format!("decode failed: {}", e)))
    }
}

/// The server's encoded, blinded set.
///
/// Produced once per server set and reusable across any number of clients.
/// The data structure travels as its `u8` tag so an unknown kind can be told
/// apart from a corrupt message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "SetupFields", try_from = "SetupFields")]
pub struct ServerSetup {
    pub data_structure: DataStructure,
    /// Rate the caller asked for over the whole client set.
    pub false_positive_rate: f64,
    pub num_client_elements_hint: Option<usize>,
    /// Encoding of the set in the format named by `data_structure`.
    pub encoded_set: Vec<u8>,
}

impl ServerSetup {
    /// Decode the carried set.
    ///
    /// # Errors
    /// - `PsiError::InvalidFalsePositiveRate` if a compact encoding carries a
    ///   rate outside `(0, 1)`
    /// - `PsiError::MalformedMessage` if the set bytes do not decode
    pub fn decode_set(&self) -> Result<EncodedSet> {
        if self.data_structure.is_compact() {
            validate_fpr(self.false_positive_rate)?;
        }
        let set = EncodedSet::decode(self.data_structure, &self.encoded_set)?;
        debug!(
            "Decoded {} setup ({} bytes)",
            self.data_structure,
            self.encoded_set.len()
        );
        Ok(set)
    }
}

/// Serialized form of `ServerSetup`.
#[derive(Serialize, Deserialize)]
struct SetupFields {
    data_structure: u8,
    false_positive_rate: f64,
    num_client_elements_hint: Option<usize>,
    encoded_set: Vec<u8>,
}

impl From<ServerSetup> for SetupFields {
    fn from(setup: ServerSetup) -> Self {
        Self {
            data_structure: setup.data_structure.into(),
            false_positive_rate: setup.false_positive_rate,
            num_client_elements_hint: setup.num_client_elements_hint,
            encoded_set: setup.encoded_set,
        }
    }
}

impl TryFrom<SetupFields> for ServerSetup {
    type Error = PsiError;

    fn try_from(fields: SetupFields) -> Result<Self> {
        Ok(Self {
            data_structure: DataStructure::try_from(fields.data_structure)?,
            false_positive_rate: fields.false_positive_rate,
            num_client_elements_hint: fields.num_client_elements_hint,
            encoded_set: fields.encoded_set,
        })
    }
}

impl WireMessage for ServerSetup {
    /// # Errors
    /// - `PsiError::MalformedMessage` if the bytes are truncated
    /// - `PsiError::UnsupportedDataStructure` if the data structure tag is
    ///   unknown
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let fields: SetupFields = bincode::deserialize(bytes)
            .map_err(|e| PsiError::malformed(format!("decode failed: {}", e)))?;
        ServerSetup::try_from(fields)
    }
}

/// The client's blinded elements, index-aligned with its input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRequest {
    pub encrypted_elements: Vec<BlindedPoint>,
    /// Reveal mode of the client session, checked by the server.
    pub reveal_intersection: bool,
}

impl ClientRequest {
    pub fn len(&self) -> usize {
        self.encrypted_elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encrypted_elements.is_empty()
    }
}

impl WireMessage for ClientRequest {}

/// The server's re-blinding of a request, index-aligned with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerResponse {
    pub encrypted_elements: Vec<BlindedPoint>,
}

impl ServerResponse {
    pub fn len(&self) -> usize {
        self.encrypted_elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encrypted_elements.is_empty()
    }

    /// Check that this response can belong to `request`.
    ///
    /// # Errors
    /// Returns `PsiError::MalformedMessage` if the lengths differ.
    pub fn validate_against(&self, request: &ClientRequest) -> Result<()> {
        if self.len() != request.len() {
            return Err(PsiError::malformed(format!(
                "response has {} elements but request had {}",
                self.len(),
                request.len()
            )));
        }
        Ok(())
    }
}

impl WireMessage for ServerResponse {}

/// Matching `(client index, server index)` pairs.
///
/// Pairs are in no particular order. Duplicate values on either side produce
/// one pair per combination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationTable {
    pub client_indices: Vec<usize>,
    pub server_indices: Vec<usize>,
}

impl AssociationTable {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (usize, usize)>) -> Self {
        let (client_indices, server_indices) = pairs.into_iter().unzip();
        Self {
            client_indices,
            server_indices,
        }
    }

    pub fn len(&self) -> usize {
        self.client_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.client_indices.is_empty()
    }

    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.client_indices
            .iter()
            .copied()
            .zip(self.server_indices.iter().copied())
    }

    /// Pairs sorted by `(client index, server index)`.
    pub fn sorted_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs: Vec<_> = self.pairs().collect();
        pairs.sort_unstable();
        pairs
    }

    /// Translate server sorted positions into original server indices.
    ///
    /// # Errors
    /// Returns `PsiError::MalformedMessage` if a position is outside the
    /// permutation.
    pub fn apply_permutation(&self, permutation: &SortingPermutation) -> Result<Self> {
        let server_indices = self
            .server_indices
            .iter()
            .map(|&pos| {
                permutation.original_index(pos).ok_or_else(|| {
                    PsiError::malformed(format!(
                        "server position {} outside sorting permutation of length {}",
                        pos,
                        permutation.len()
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            client_indices: self.client_indices.clone(),
            server_indices,
        })
    }
}
