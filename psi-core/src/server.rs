//! Server side of the PSI protocol.

use log::{debug, info};

use crate::config::{per_element_fpr, validate_fpr, SetupConfig};
use crate::crypto::CommutativeBlinder;
use crate::datastructure::{DataStructure, EncodedSet, SortingPermutation};
use crate::error::{PsiError, Result};
use crate::key::KEY_SIZE;
use crate::messages::{ClientRequest, ServerResponse, ServerSetup};
use crate::state::Session;

/// The party holding the set the client queries against.
///
/// The server never sees client elements in the clear: requests arrive
/// blinded with the client's key, which the server does not have.
#[derive(Debug, Clone)]
pub struct PsiServer {
    session: Session,
}

impl PsiServer {
    /// Create a server with a fresh random key.
    pub fn create_with_new_key(reveal_intersection: bool) -> Self {
        Self {
            session: Session::with_new_key(reveal_intersection),
        }
    }

    /// Create a server from previously exported key bytes.
    ///
    /// # Arguments
    /// * `key_bytes` - 32-byte key, as returned by `private_key_bytes`
    /// * `reveal_intersection` - Whether clients may learn matching indices
    ///
    /// # Errors
    /// Returns `PsiError::InvalidKeyLength` if `key_bytes` is not 32 bytes,
    /// or `PsiError::InvalidKey` if they reduce to the zero scalar.
    pub fn create_from_key(key_bytes: &[u8], reveal_intersection: bool) -> Result<Self> {
        Ok(Self {
            session: Session::from_key_bytes(key_bytes, reveal_intersection)?,
        })
    }

    pub fn private_key_bytes(&self) -> [u8; KEY_SIZE] {
        self.session.private_key_bytes()
    }

    pub fn reveal_intersection(&self) -> bool {
        self.session.reveal_intersection()
    }

    /// Blind the server set and encode it for the client.
    ///
    /// `fpr` bounds the expected number of false positives over the whole
    /// client set; it is ignored for `DataStructure::Raw`. A `None` or zero
    /// `num_client_elements_hint` means the client set size is unknown.
    ///
    /// # Arguments
    /// * `fpr` - Expected false positives over the whole client set
    /// * `num_client_elements_hint` - Client set size, if known
    /// * `elements` - The server's elements
    /// * `data_structure` - Encoding of the blinded set
    ///
    /// # Returns
    /// A setup message, reusable for any number of clients
    ///
    /// # Errors
    /// Returns `PsiError::InvalidFalsePositiveRate` if `data_structure` is
    /// compact and `fpr` is outside `(0, 1)`.
    pub fn create_setup_message<T: AsRef<[u8]> + Sync>(
        &self,
        fpr: f64,
        num_client_elements_hint: Option<usize>,
        elements: &[T],
        data_structure: DataStructure,
    ) -> Result<ServerSetup> {
        self.build_setup(fpr, num_client_elements_hint, elements, data_structure)
            .map(|(setup, _)| setup)
    }

    /// Like `create_setup_message`, also returning the permutation from
    /// sorted encoding positions to indices of `elements`.
    ///
    /// # Errors
    /// Returns `PsiError::UnsupportedDataStructure` for
    /// `DataStructure::BloomFilter`, which keeps no positions.
    pub fn create_setup_message_with_permutation<T: AsRef<[u8]> + Sync>(
        &self,
        fpr: f64,
        num_client_elements_hint: Option<usize>,
        elements: &[T],
        data_structure: DataStructure,
    ) -> Result<(ServerSetup, SortingPermutation)> {
        if data_structure == DataStructure::BloomFilter {
            return Err(PsiError::UnsupportedDataStructure(
                "BloomFilter has no sorting permutation".to_string(),
            ));
        }
        let (setup, permutation) =
            self.build_setup(fpr, num_client_elements_hint, elements, data_structure)?;
        let permutation = permutation.ok_or_else(|| {
            PsiError::UnsupportedDataStructure(format!("{} has no sorting permutation", data_structure))
        })?;
        Ok((setup, permutation))
    }

    /// `create_setup_message` driven by a `SetupConfig`.
    pub fn create_setup_message_from_config<T: AsRef<[u8]> + Sync>(
        &self,
        config: &SetupConfig,
        elements: &[T],
    ) -> Result<ServerSetup> {
        config.validate()?;
        self.create_setup_message(
            config.false_positive_rate,
            config.num_client_elements_hint,
            elements,
            config.data_structure,
        )
    }

    fn build_setup<T: AsRef<[u8]> + Sync>(
        &self,
        fpr: f64,
        num_client_elements_hint: Option<usize>,
        elements: &[T],
        data_structure: DataStructure,
    ) -> Result<(ServerSetup, Option<SortingPermutation>)> {
        if data_structure.is_compact() {
            validate_fpr(fpr)?;
        }
        info!(
            "Creating {} setup for {} server elements",
            data_structure,
            elements.len()
        );

        let blinded = self.session.blinder.hash_blind(elements, &self.session.key);
        let element_fpr = per_element_fpr(fpr, num_client_elements_hint, elements.len());
        let (set, permutation) = EncodedSet::encode(data_structure, &blinded, element_fpr)?;
        let encoded_set = set.to_bytes();
        debug!(
            "Setup encoded in {} bytes (per-element rate {:e})",
            encoded_set.len(),
            element_fpr
        );

        let setup = ServerSetup {
            data_structure,
            false_positive_rate: fpr,
            num_client_elements_hint,
            encoded_set,
        };
        Ok((setup, permutation))
    }

    /// Re-blind each request entry with the server key, in order.
    ///
    /// # Arguments
    /// * `request` - The client's blinded elements
    ///
    /// # Returns
    /// A response of the same length, entry `i` answering request entry `i`
    ///
    /// # Errors
    /// - `PsiError::IntersectionModeMismatch` if the client's reveal mode
    ///   differs from the server's
    /// - `PsiError::MalformedMessage` if an entry is not a valid point
    pub fn process_request(&self, request: &ClientRequest) -> Result<ServerResponse> {
        self.session.require_mode(request.reveal_intersection)?;
        let encrypted_elements = self
            .session
            .blinder
            .reblind(&request.encrypted_elements, &self.session.key)?;
        debug!("Processed request of {} elements", encrypted_elements.len());
        Ok(ServerResponse { encrypted_elements })
    }
}
