//! # shadow-crypto — Cryptographic Primitives for the Shadow Pool
//!
//! This crate provides the building blocks the pool and its clients share:
//!
//! - **Poseidon** hashing over the BN254 scalar field with circom
//!   parameters, so every hash matches what a withdrawal circuit computes.
//! - **Commitments and nullifier hashes** derived from a depositor's secret
//!   material.
//! - **Deposit notes**: the client-held bundle of secret material, with a
//!   portable text encoding and zeroize-on-drop.
//! - **Merkle accumulator**: the fixed-depth append-only tree of
//!   commitments, with a bounded history of recent roots.
//!
//! Everything here is pure computation over [`FieldElement`]s; there is no
//! I/O and no shared state.
//!
//! [`FieldElement`]: shadow_core::FieldElement

pub mod commitment;
pub mod error;
pub mod merkle;
pub mod note;
pub mod poseidon;

// Re-export primary types.
pub use commitment::{
    commit, commit_raw, nullifier_hash, Commitment, NullifierHash, NullifierSeed,
    RecipientBinding, Secret,
};
pub use error::CryptoError;
pub use merkle::{MerkleAccumulator, MerkleProof, RootEntry, RootHistory};
pub use note::DepositNote;
pub use poseidon::{hash_pair, poseidon_hash};
