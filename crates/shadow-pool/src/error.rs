//! # Pool Errors
//!
//! Every rejection maps onto an [`ErrorKind`] so callers can tell a stale
//! root (retry with a fresh one) from a double spend (abandon).

use shadow_core::{
    Address, Amount, BlockNumber, ConfigError, ErrorKind, FieldElement, ParameterError,
};
use shadow_crypto::{CryptoError, NullifierHash};
use shadow_state::GovernanceError;
use shadow_zkp::VerifyError;
use thiserror::Error;

use crate::fee::FeeError;

/// Errors from pool entry points.
#[derive(Error, Debug)]
pub enum PoolError {
    /// Zero amount, or transferred value differing from the stated amount.
    #[error("invalid amount {amount}: {reason}")]
    InvalidAmount { amount: Amount, reason: String },

    /// The zero commitment is reserved for empty leaves.
    #[error("commitment must be non-zero")]
    InvalidCommitment,

    /// A commitment can be inserted only once.
    #[error("commitment {0} is already in the tree")]
    DuplicateCommitment(FieldElement),

    /// The root is not among the last `K` roots.
    #[error("root {0} is not a known recent root")]
    UnknownRoot(FieldElement),

    /// The nullifier has been spent.
    #[error("nullifier {0} has already been spent")]
    NullifierAlreadySpent(NullifierHash),

    /// Public fee disagrees with the fee schedule of the submitting block.
    #[error("fee {provided} does not match required fee {required} at block {block}")]
    FeeMismatch {
        provided: Amount,
        required: Amount,
        block: BlockNumber,
    },

    /// Fee larger than the withdrawn amount.
    #[error("fee {fee} exceeds amount {amount}")]
    FeeExceedsAmount { fee: Amount, amount: Amount },

    #[error(transparent)]
    Fee(#[from] FeeError),

    /// Proof rejected by the backend.
    #[error("proof verification failed: {0}")]
    InvalidProof(String),

    /// The pool holds less than the requested amount.
    #[error("pool holds {available}, cannot release {requested}")]
    InsufficientPoolBalance {
        available: Amount,
        requested: Amount,
    },

    /// Value-only deposits are switched off.
    #[error("legacy value-only deposits are disabled")]
    LegacyDepositsDisabled,

    /// A transaction claiming a submission block after its inclusion block.
    #[error("submitted at block {submitted_at}, after inclusion block {included_at}")]
    FutureSubmission {
        submitted_at: BlockNumber,
        included_at: BlockNumber,
    },

    /// Inclusion block earlier than a transition the pool already applied.
    #[error("inclusion block {included_at} precedes last applied block {last_block}")]
    BlockRegression {
        included_at: BlockNumber,
        last_block: BlockNumber,
    },

    /// Submitted too long before inclusion to claim that block's fee schedule.
    #[error("submitted at block {submitted_at}, included at {included_at}: lag exceeds {max_lag} blocks")]
    SubmissionExpired {
        submitted_at: BlockNumber,
        included_at: BlockNumber,
        max_lag: u64,
    },

    /// Deposit pinned a post-insertion root the tree would not produce.
    #[error("expected root after insertion {expected}, tree would produce {actual}")]
    RootMismatch {
        expected: FieldElement,
        actual: FieldElement,
    },

    /// Arithmetic on pool balances overflowed.
    #[error("balance overflow crediting {0}")]
    BalanceOverflow(Address),

    /// A snapshot failed its consistency checks.
    #[error("snapshot integrity check failed: {0}")]
    Integrity(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Governance(#[from] GovernanceError),

    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl PoolError {
    /// The taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownRoot(_) => ErrorKind::UnknownRoot,
            Self::NullifierAlreadySpent(_) => ErrorKind::NullifierAlreadySpent,
            Self::InvalidProof(_) => ErrorKind::InvalidProof,
            Self::Fee(e) => e.kind(),
            Self::Crypto(e) => e.kind(),
            Self::Governance(e) => e.kind(),
            Self::Parameter(e) => e.kind(),
            _ => ErrorKind::Other,
        }
    }
}

impl From<VerifyError> for PoolError {
    fn from(err: VerifyError) -> Self {
        Self::InvalidProof(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shadow_core::Disposition;

    #[test]
    fn stale_root_is_retryable() {
        let err = PoolError::UnknownRoot(FieldElement::from_u64(1));
        assert_eq!(err.kind().disposition(), Disposition::Retry);
    }

    #[test]
    fn double_spend_is_abandoned() {
        let err = PoolError::NullifierAlreadySpent(NullifierHash(FieldElement::from_u64(2)));
        assert_eq!(err.kind(), ErrorKind::NullifierAlreadySpent);
        assert_eq!(err.kind().disposition(), Disposition::Abandon);
    }

    #[test]
    fn nested_kinds_are_preserved() {
        let err = PoolError::from(CryptoError::TreeFull { capacity: 4 });
        assert_eq!(err.kind(), ErrorKind::TreeFull);
        let err = PoolError::from(FeeError::FeeOverflow {
            amount: Amount(u128::MAX),
            percentage_fee_bps: 2,
        });
        assert_eq!(err.kind(), ErrorKind::FeeOverflow);
    }
}
