//! # Error Taxonomy
//!
//! Every rejection the protocol core can produce is recoverable and must be
//! distinguishable by kind. Each crate keeps its own `thiserror` enum with
//! diagnostic context, and each of those enums exposes `kind()` returning an
//! [`ErrorKind`] from the fixed taxonomy below.
//!
//! ## Design
//!
//! - The core never retries on its own. [`ErrorKind::disposition`] tells the
//!   caller whether a fresh attempt can succeed (stale root), whether waiting
//!   will help (vote window not open), or whether to give up.
//! - A failed operation leaves all shared state unchanged, so every
//!   disposition is safe to act on immediately.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The protocol's rejection kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// A byte string does not canonically encode a field element.
    InvalidFieldEncoding,
    /// The Merkle accumulator holds `2^D` leaves.
    TreeFull,
    /// A leaf index that was never inserted.
    IndexOutOfRange,
    /// The root is not among the last `K` roots.
    UnknownRoot,
    /// The nullifier has already been recorded as spent.
    NullifierAlreadySpent,
    /// The proof backend rejected the proof.
    InvalidProof,
    /// Fee arithmetic overflowed.
    FeeOverflow,
    /// Proposer weight is below the proposal threshold.
    BelowProposalThreshold,
    /// The proposal is outside its voting window.
    ProposalNotActive,
    /// The voter already voted on this proposal.
    AlreadyVoted,
    /// The proposal did not succeed.
    NotSucceeded,
    /// The proposal was already executed.
    AlreadyExecuted,
    /// Any other validation failure (bad amount, bad configuration, ...).
    Other,
}

/// What a caller should do after a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Disposition {
    /// Refresh the observed state (e.g. re-fetch the root) and resubmit.
    Retry,
    /// Resubmit unchanged once the chain has advanced.
    Wait,
    /// Do not resubmit.
    Abandon,
}

impl ErrorKind {
    /// The caller-side handling for this kind.
    pub fn disposition(&self) -> Disposition {
        match self {
            Self::UnknownRoot => Disposition::Retry,
            Self::ProposalNotActive => Disposition::Wait,
            _ => Disposition::Abandon,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::InvalidFieldEncoding => "InvalidFieldEncoding",
            Self::TreeFull => "TreeFull",
            Self::IndexOutOfRange => "IndexOutOfRange",
            Self::UnknownRoot => "UnknownRoot",
            Self::NullifierAlreadySpent => "NullifierAlreadySpent",
            Self::InvalidProof => "InvalidProof",
            Self::FeeOverflow => "FeeOverflow",
            Self::BelowProposalThreshold => "BelowProposalThreshold",
            Self::ProposalNotActive => "ProposalNotActive",
            Self::AlreadyVoted => "AlreadyVoted",
            Self::NotSucceeded => "NotSucceeded",
            Self::AlreadyExecuted => "AlreadyExecuted",
            Self::Other => "Other",
        };
        f.write_str(s)
    }
}

/// Error decoding a field element or a fixed-width identifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// The input does not canonically encode a value in the scalar field.
    #[error("invalid field encoding: {reason}")]
    InvalidFieldEncoding {
        /// Why the input was rejected.
        reason: String,
    },

    /// An address string or byte slice has the wrong shape.
    #[error("invalid address: \"{0}\" (expected 0x followed by 40 hex digits)")]
    InvalidAddress(String),

    /// A decimal amount string could not be parsed.
    #[error("invalid amount \"{value}\": {reason}")]
    InvalidAmount {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl FieldError {
    pub(crate) fn encoding(reason: impl Into<String>) -> Self {
        Self::InvalidFieldEncoding {
            reason: reason.into(),
        }
    }

    /// The taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidFieldEncoding { .. } => ErrorKind::InvalidFieldEncoding,
            Self::InvalidAddress(_) | Self::InvalidAmount { .. } => ErrorKind::Other,
        }
    }
}
