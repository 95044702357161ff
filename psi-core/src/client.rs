//! Client side of the PSI protocol.

use log::{debug, info};

use crate::crypto::{BlindedPoint, CommutativeBlinder};
use crate::datastructure::EncodedSet;
use crate::error::Result;
use crate::key::KEY_SIZE;
use crate::messages::{ClientRequest, ServerResponse, ServerSetup};
use crate::state::Session;

/// The party that learns the intersection.
///
/// Results are index-based: every index the client returns refers to the
/// position of an element in the slice passed to `create_request`.
#[derive(Debug, Clone)]
pub struct PsiClient {
    pub(crate) session: Session,
}

impl PsiClient {
    /// Create a client with a fresh random key.
    pub fn create_with_new_key(reveal_intersection: bool) -> Self {
        Self {
            session: Session::with_new_key(reveal_intersection),
        }
    }

    /// Create a client from previously exported key bytes.
    ///
    /// # Errors
    /// Returns `PsiError::InvalidKeyLength` if `key_bytes` is not 32 bytes.
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

    /// Blind each element with the client key.
    ///
    /// # Arguments
    /// * `elements` - The client's elements
    ///
    /// # Returns
    /// A request whose position `i` always corresponds to `elements[i]`
    pub fn create_request<T: AsRef<[u8]> + Sync>(&self, elements: &[T]) -> ClientRequest {
        info!("Creating request for {} client elements", elements.len());
        ClientRequest {
            encrypted_elements: self.session.blinder.hash_blind(elements, &self.session.key),
            reveal_intersection: self.session.reveal_intersection,
        }
    }

    /// Number of client elements that test as members of the server set.
    ///
    /// Exact for `DataStructure::Raw`. For compact structures false positives
    /// can only add hits, about `setup.false_positive_rate` of them in
    /// expectation.
    ///
    /// # Errors
    /// Returns `PsiError::MalformedMessage` or
    /// `PsiError::InvalidFalsePositiveRate` if the setup or response does not
    /// decode.
    pub fn get_intersection_size(&self, setup: &ServerSetup, response: &ServerResponse) -> Result<usize> {
        let size = self.matching_indices(setup, response)?.len();
        debug!("Intersection size {} of {}", size, response.len());
        Ok(size)
    }

    /// Indices of client elements that test as members of the server set.
    ///
    /// # Arguments
    /// * `setup` - The server's setup message
    /// * `response` - The server's answer to this client's request
    ///
    /// # Returns
    /// Ascending indices into the slice passed to `create_request`
    ///
    /// # Errors
    /// - `PsiError::IntersectionNotRevealable` if this session is size-only
    /// - `PsiError::MalformedMessage` or `PsiError::InvalidFalsePositiveRate`
    ///   if the setup or response does not decode
    pub fn get_intersection(&self, setup: &ServerSetup, response: &ServerResponse) -> Result<Vec<usize>> {
        self.session.require_reveal()?;
        let indices = self.matching_indices(setup, response)?;
        debug!("Intersection of {} elements", indices.len());
        Ok(indices)
    }

    fn matching_indices(&self, setup: &ServerSetup, response: &ServerResponse) -> Result<Vec<usize>> {
        let (set, unblinded) = self.decode(setup, response)?;
        Ok(set.intersect(&unblinded))
    }

    /// Decode the setup and strip the client key from the response.
    ///
    /// What remains for client element `x` is `hash_to_point(x)` blinded with
    /// the server key only, which is what the setup encodes.
    pub(crate) fn decode(
        &self,
        setup: &ServerSetup,
        response: &ServerResponse,
    ) -> Result<(EncodedSet, Vec<BlindedPoint>)> {
        let set = setup.decode_set()?;
        let unblinded = self
            .session
            .blinder
            .unblind(&response.encrypted_elements, &self.session.key)?;
        Ok((set, unblinded))
    }
}
