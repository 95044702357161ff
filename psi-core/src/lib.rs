//! # Private Set Intersection (PSI) Engine
//!
//! This library implements two-party Private Set Intersection using
//! commutative blinding on the Ristretto group (curve25519-dalek).
//!
//! A client and a server each hold a set of byte strings. The client learns
//! which of its elements the server also holds (or only how many, or an
//! association table pairing matching client and server elements). Neither
//! party learns anything about the other's non-matching elements. Security
//! is against semi-honest parties only.
//!
//! ## Features
//!
//! - **Transport Agnostic**: The library handles the protocol logic but leaves
//!   message exchange to the user.
//! - **Serialization Agnostic**: Message types derive serde; the
//!   [`WireMessage`] trait offers a bincode encoding out of the box.
//! - **Compact Setup Messages**: The server set can be sent raw, as a Bloom
//!   filter, or as a Golomb-Compressed Set, trading bandwidth for a tunable
//!   false positive rate.
//! - **Index-Based Results**: Intersections and association tables refer to
//!   positions in the caller's input slices.
//!
//! ## Protocol Overview
//!
//! 1. **Setup** (server): hash each server element to the curve, blind it
//!    with the server key, and encode the blinded set. The setup message does
//!    not depend on any client and may be reused.
//!
//! 2. **Request** (client): hash and blind each client element with the
//!    client key.
//!
//! 3. **Response** (server): blind every request entry again with the
//!    server key, preserving order.
//!
//! 4. **Result** (client): remove the client key from each response entry and
//!    test it against the setup.
//!
//! ## Example Usage
//!
//! ```
//! use psi_core::{DataStructure, PsiClient, PsiError, PsiServer};
//!
//! let server = PsiServer::create_with_new_key(true);
//! let client = PsiClient::create_with_new_key(true);
//!
//! let server_items = vec!["banana", "cherry", "date"];
//! let client_items = vec!["apple", "banana"];
//!
//! let setup = server.create_setup_message(0.001, Some(client_items.len()), &server_items, DataStructure::Gcs)?;
//! let request = client.create_request(&client_items);
//! let response = server.process_request(&request)?;
//!
//! assert_eq!(client.get_intersection(&setup, &response)?, vec![1]);
//! # Ok::<(), PsiError>(())
//! ```
//!
//! ## Security Considerations
//!
//! - Reveal mode is fixed when a client or server is created; a size-only
//!   client refuses to compute per-element matches.
//! - With Bloom filter or GCS setups the client may see false positives, at
//!   the rate the server chose.
//! - Messages should travel over an authenticated channel.
//!
//! ## Modules
//!
//! - [`key`] - Private keys
//! - [`crypto`] - Hash-to-curve and commutative blinding
//! - [`datastructure`] - Raw, Bloom filter and GCS set encodings
//! - [`config`] - Setup parameters
//! - [`messages`] - Message types for protocol exchange
//! - [`server`] / [`client`] - The two protocol roles
//! - [`error`] - Error types

pub use client::PsiClient;
pub use config::SetupConfig;
pub use crypto::{BlindedPoint, CommutativeBlinder, RistrettoParallel, RistrettoSequential};
pub use datastructure::{DataStructure, SortingPermutation};
pub use error::{PsiError, Result};
pub use key::PrivateKey;
pub use messages::{AssociationTable, ClientRequest, ServerResponse, ServerSetup, WireMessage};
pub use server::PsiServer;

mod association;
pub mod client;
pub mod config;
pub mod crypto;
pub mod datastructure;
pub mod error;
pub mod key;
pub mod messages;
pub mod server;
mod state;

/// Version of this engine build.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version of this engine build.
pub fn version() -> &'static str {
    VERSION
}
