//! Association tables: which client element matches which server element.
//!
//! Unlike a plain intersection, an association table keeps every matching
//! server element, so joins over duplicate-valued keys (e.g. categorical
//! columns) come out as the full cross product per value.

use log::debug;

use crate::client::PsiClient;
use crate::datastructure::SortingPermutation;
use crate::error::{PsiError, Result};
use crate::messages::{AssociationTable, ServerResponse, ServerSetup};

impl PsiClient {
    /// Pairs of `(client index, server position)` for every match.
    ///
    /// Server positions index the server's sorted encoding. Use
    /// `get_association_table_with_permutation`, or
    /// `AssociationTable::apply_permutation`, to turn them into indices of
    /// the server's original input.
    ///
    /// # Errors
    /// - `PsiError::IntersectionNotRevealable` if this session is size-only
    /// - `PsiError::UnsupportedDataStructure` for a Bloom filter setup
    /// - `PsiError::MalformedMessage` if the setup or response does not decode
    pub fn get_association_table(
        &self,
        setup: &ServerSetup,
        response: &ServerResponse,
    ) -> Result<AssociationTable> {
        self.session.require_reveal()?;
        let (set, unblinded) = self.decode(setup, response)?;
        let table = AssociationTable::from_pairs(set.associate(&unblinded)?);
        debug!("Association table of {} pairs", table.len());
        Ok(table)
    }

    /// `get_association_table` with server positions translated to original
    /// server indices through the permutation returned at setup time.
    ///
    /// # Errors
    /// As `get_association_table`, plus `PsiError::MalformedMessage` if the
    /// permutation does not cover every encoded server element.
    pub fn get_association_table_with_permutation(
        &self,
        setup: &ServerSetup,
        response: &ServerResponse,
        permutation: &SortingPermutation,
    ) -> Result<AssociationTable> {
        self.session.require_reveal()?;
        let (set, unblinded) = self.decode(setup, response)?;
        if let Some(n) = set.num_elements() {
            if n != permutation.len() {
                return Err(PsiError::malformed(format!(
                    "sorting permutation has {} entries for {} server elements",
                    permutation.len(),
                    n
                )));
            }
        }
        AssociationTable::from_pairs(set.associate(&unblinded)?).apply_permutation(permutation)
    }
}
