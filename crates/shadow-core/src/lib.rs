//! # shadow-core — Foundational Types for the Shadow Pool
//!
//! This crate is the leaf of the workspace dependency graph. It defines the
//! value types every other crate agrees on: the field encoding used by
//! commitments, nullifiers and Merkle nodes, token amounts, account
//! addresses, the fee and governance parameter records, and the error
//! taxonomy callers use to decide whether to retry, wait, or abandon.
//!
//! ## Key Design Principles
//!
//! 1. **One field codec.** Every cryptographic quantity is a [`FieldElement`].
//!    Construction from bytes rejects anything at or above the BN254 scalar
//!    modulus, so an out-of-range value can never reach a hash or a tree.
//!
//! 2. **Integer amounts only.** [`Amount`] is a count of base units (18
//!    decimals). Decimal strings are parsed exactly; there are no floats on
//!    any fee path.
//!
//! 3. **Parameters are versioned, never overwritten.** The
//!    [`ParameterRegistry`] keeps every [`FeeParameters`] version with the
//!    block it takes effect at, so a withdrawal is always priced with the
//!    parameters in force when it was submitted.
//!
//! 4. **Kinds, not strings.** Every crate error maps onto [`ErrorKind`], and
//!    each kind carries a [`Disposition`] telling the caller what to do next.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `shadow-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod amount;
pub mod config;
pub mod error;
pub mod field;
pub mod identity;
pub mod params;

pub use amount::{Amount, AMOUNT_DECIMALS};
pub use config::{ConfigError, GovernanceConfig, PoolConfig, ProtocolConfig};
pub use error::{Disposition, ErrorKind, FieldError};
pub use field::{FieldElement, FIELD_BYTES};
pub use identity::{Address, BlockNumber, ProposalId};
pub use params::{
    FeeParameterVersion, FeeParameters, GovernanceParameters, ParameterChange, ParameterError,
    ParameterRegistry, ParameterSink, BPS_DENOMINATOR,
};
