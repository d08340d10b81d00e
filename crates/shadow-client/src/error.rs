//! Client errors.

use std::time::Duration;

use shadow_core::{ConfigError, ErrorKind};
use shadow_crypto::{CryptoError, NullifierHash};
use shadow_pool::{FeeError, PoolError};
use shadow_zkp::ProofError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Fee(#[from] FeeError),

    #[error("proof generation failed: {0}")]
    Proof(#[from] ProofError),

    #[error("proof generation exceeded {0:?}")]
    ProofTimeout(Duration),

    /// The ledger did not answer within `timeout`. The submission keeps
    /// running on its blocking thread and may still commit, so check
    /// `nullifier_hash` with [`WithdrawalClient::is_spent`] before
    /// resubmitting the note elsewhere.
    ///
    /// [`WithdrawalClient::is_spent`]: crate::WithdrawalClient::is_spent
    #[error("submission exceeded {timeout:?}; nullifier {nullifier_hash} may still be spent")]
    SubmitTimeout {
        timeout: Duration,
        nullifier_hash: NullifierHash,
    },

    /// The ledger rejected the withdrawal.
    #[error("withdrawal rejected: {0}")]
    Rejected(#[from] PoolError),

    /// The ledger kept rejecting with a retryable error.
    #[error("withdrawal still rejected after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: PoolError },

    #[error("prover returned {0} public inputs for a withdrawal")]
    UnexpectedPublicInputs(&'static str),

    #[error("background task failed: {0}")]
    Task(String),

    #[error("tracing initialisation failed: {0}")]
    Telemetry(String),
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Crypto(e) => e.kind(),
            Self::Fee(e) => e.kind(),
            Self::Proof(e) => e.kind(),
            Self::Rejected(e) | Self::Exhausted { last: e, .. } => e.kind(),
            _ => ErrorKind::Other,
        }
    }
}

impl From<tokio::task::JoinError> for ClientError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}
