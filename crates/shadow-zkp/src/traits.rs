//! # Proof Backend Trait
//!
//! Defines the interface the pool and its clients use to produce and check
//! zero-knowledge proofs. Every backend, mock or real, implements
//! [`ProofBackend`].
//!
//! ## Security Invariant
//!
//! `verify` is a pure function of the key, the proof and the public inputs.
//! A backend must never accept a proof generated for different public
//! inputs. Verification failures are reported as `Ok(false)`; `Err` is
//! reserved for inputs the backend cannot evaluate at all, and the pool
//! treats both the same way.

use serde::{de::DeserializeOwned, Serialize};
use shadow_core::ErrorKind;
use shadow_crypto::CryptoError;
use thiserror::Error;

use crate::inputs::{CircuitInputs, PublicInputs};

/// Error during proof generation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProofError {
    /// The witness does not satisfy the statement.
    #[error("witness error: {0}")]
    WitnessError(String),
    /// Internal prover error.
    #[error("prover error: {0}")]
    ProverError(String),
    /// Hashing the witness failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl ProofError {
    /// The taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Crypto(e) => e.kind(),
            Self::WitnessError(_) | Self::ProverError(_) => ErrorKind::Other,
        }
    }
}

/// Error during proof verification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// The proof bytes cannot be interpreted.
    #[error("malformed proof: {0}")]
    MalformedProof(String),
    /// The verifying key is incompatible with the statement.
    #[error("key mismatch: {0}")]
    KeyMismatch(String),
}

impl VerifyError {
    /// The taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidProof
    }
}

/// Abstract interface for a zero-knowledge proof backend.
///
/// Proof generation is the slow half and is expected to run off the async
/// executor (see `shadow-client`). Both halves must be safe to call from
/// several threads at once.
pub trait ProofBackend: Send + Sync {
    /// The proof type produced by this backend.
    type Proof: Clone + std::fmt::Debug + Serialize + DeserializeOwned + Send + Sync;
    /// The verifying key type.
    type VerifyingKey: Clone + Send + Sync;
    /// The proving key type.
    type ProvingKey: Send + Sync;

    /// Prove the statement described by `inputs`.
    ///
    /// Returns the proof and the public inputs it is bound to.
    fn generate_proof(
        &self,
        pk: &Self::ProvingKey,
        inputs: &CircuitInputs,
    ) -> Result<(Self::Proof, PublicInputs), ProofError>;

    /// Check `proof` against `public_inputs`.
    fn verify(
        &self,
        vk: &Self::VerifyingKey,
        proof: &Self::Proof,
        public_inputs: &PublicInputs,
    ) -> Result<bool, VerifyError>;
}
