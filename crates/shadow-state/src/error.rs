//! # Governance Errors

use shadow_core::{Address, BlockNumber, ErrorKind, ParameterError, ProposalId};
use thiserror::Error;

use crate::proposal::ProposalState;

/// Errors from proposal creation, voting, execution and cancellation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GovernanceError {
    /// Proposer weight below the proposal threshold.
    #[error("proposer {proposer} holds {votes} votes, below threshold {threshold}")]
    BelowProposalThreshold {
        proposer: Address,
        votes: u128,
        threshold: u128,
    },

    /// Vote outside the voting window, or on a canceled/executed proposal.
    #[error("proposal {id} is not active (state {state})")]
    ProposalNotActive { id: ProposalId, state: ProposalState },

    /// Second vote by the same voter.
    #[error("{voter} already voted on proposal {id}")]
    AlreadyVoted { id: ProposalId, voter: Address },

    /// Execution of a proposal that did not succeed.
    #[error("proposal {id} cannot be executed in state {state}")]
    NotSucceeded { id: ProposalId, state: ProposalState },

    /// Second execution, or cancellation after execution.
    #[error("proposal {0} was already executed")]
    AlreadyExecuted(ProposalId),

    /// Cancellation of a canceled proposal.
    #[error("proposal {0} was already canceled")]
    AlreadyCanceled(ProposalId),

    /// No proposal with this id.
    #[error("unknown proposal {0}")]
    UnknownProposal(ProposalId),

    /// The action vectors have different lengths.
    #[error("proposal arity mismatch: {targets} targets, {values} values, {signatures} signatures, {calldatas} calldatas")]
    ArityMismatch {
        targets: usize,
        values: usize,
        signatures: usize,
        calldatas: usize,
    },

    /// A proposal with no actions.
    #[error("proposal must contain at least one action")]
    NoActions,

    /// More actions than `max_operations`.
    #[error("proposal has {count} actions, maximum is {max}")]
    TooManyActions { count: usize, max: usize },

    /// A function signature the protocol does not expose.
    #[error("unsupported action signature \"{0}\"")]
    UnsupportedAction(String),

    /// Calldata of the wrong length or with out-of-range words.
    #[error("invalid calldata for {signature}: {reason}")]
    InvalidCalldata { signature: String, reason: String },

    /// Actions cannot transfer value.
    #[error("action {index} carries non-zero value {value}")]
    NonZeroValue { index: usize, value: u128 },

    /// The proposer already has a pending or active proposal.
    #[error("{proposer} already has live proposal {existing}")]
    ProposerHasLiveProposal {
        proposer: Address,
        existing: ProposalId,
    },

    /// Caller is neither guardian nor proposer, and the proposer still meets the threshold.
    #[error("{caller} may not cancel proposal {id}")]
    NotAuthorizedToCancel { id: ProposalId, caller: Address },

    /// Checkpoints must be written in block order.
    #[error("checkpoint for {account} at block {block} precedes latest checkpoint at {latest}")]
    CheckpointOutOfOrder {
        account: Address,
        block: BlockNumber,
        latest: BlockNumber,
    },

    /// Block arithmetic overflowed.
    #[error("block number overflow computing voting window from block {0}")]
    BlockOverflow(BlockNumber),

    /// A parameter change failed validation.
    #[error(transparent)]
    Parameter(#[from] ParameterError),
}

impl GovernanceError {
    /// The taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BelowProposalThreshold { .. } => ErrorKind::BelowProposalThreshold,
            Self::ProposalNotActive { .. } => ErrorKind::ProposalNotActive,
            Self::AlreadyVoted { .. } => ErrorKind::AlreadyVoted,
            Self::NotSucceeded { .. } => ErrorKind::NotSucceeded,
            Self::AlreadyExecuted(_) => ErrorKind::AlreadyExecuted,
            Self::AlreadyCanceled(_)
            | Self::UnknownProposal(_)
            | Self::ArityMismatch { .. }
            | Self::NoActions
            | Self::TooManyActions { .. }
            | Self::UnsupportedAction(_)
            | Self::InvalidCalldata { .. }
            | Self::NonZeroValue { .. }
            | Self::ProposerHasLiveProposal { .. }
            | Self::NotAuthorizedToCancel { .. }
            | Self::CheckpointOutOfOrder { .. }
            | Self::BlockOverflow(_) => ErrorKind::Other,
            Self::Parameter(e) => e.kind(),
        }
    }
}
