//! Audit immutability and integrity verification.
//!
//! Every entry carries a SHA-256 digest of its identifying fields, and
//! entries written after chain-linking was introduced also record the digest
//! of their predecessor under `previousHash` in their metadata. Rewriting any
//! historical entry therefore either breaks its own digest or the link held
//! by its successor.

mod hash;
mod hash_chain;

pub use hash::{canonical_timestamp, compute_entry_hash, hash_matches};
pub use hash_chain::{linked_previous_hash, ChainError, ChainSealer, HashChainVerifier};
