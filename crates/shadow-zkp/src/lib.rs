//! # shadow-zkp — Proof Backend Boundary
//!
//! The pool never inspects a proof. It hands the proof and the public
//! inputs to a [`ProofBackend`] and acts on the boolean it gets back. This
//! crate defines that boundary.
//!
//! ## Architecture
//!
//! - **Traits** (`traits.rs`): `ProofBackend` with associated proof and key
//!   types, so a mock and a real prover are interchangeable at compile time.
//!
//! - **Inputs** (`inputs.rs`): the public inputs of the deposit and
//!   withdrawal statements, and the private circuit inputs a prover needs.
//!   Withdrawal public inputs are always ordered
//!   `[root, nullifier, recipient, fee, amount]`.
//!
//! - **Mock** (`mock.rs`): `MockProofBackend` checks that the witness
//!   actually satisfies the statement and emits a SHA-256 tag bound to the
//!   key and the public inputs. It offers no zero knowledge.
//!
//! ## Crate Policy
//!
//! - Depends on `shadow-core` and `shadow-crypto` internally.
//! - The mock backend sits behind the default `mock` feature.

pub mod inputs;
#[cfg(feature = "mock")]
pub mod mock;
pub mod traits;

pub use inputs::{
    CircuitInputs, CircuitKind, DepositPublicInputs, PublicInputs, WithdrawPublicInputs,
    WITHDRAW_PUBLIC_INPUT_COUNT,
};
#[cfg(feature = "mock")]
pub use mock::{MockProof, MockProofBackend, MockProvingKey, MockVerifyingKey};
pub use traits::{ProofBackend, ProofError, VerifyError};
