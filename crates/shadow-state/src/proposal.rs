//! # Proposal Lifecycle
//!
//! ## States
//!
//! ```text
//! Pending ──▶ Active ──▶ Succeeded ──▶ Executed (terminal)
//!    │          │            │
//!    │          └──▶ Defeated│
//!    │                       │
//!    └──────────┴────────────┴──▶ Canceled (terminal)
//! ```
//!
//! Pending, Active, Defeated and Succeeded are not stored; they are
//! evaluated from the block number and the tally. Executed and Canceled
//! are recorded with a [`ProposalTransitionRecord`].
//!
//! At or after `end_block` a proposal has succeeded iff
//! `for_votes > against_votes` and `for_votes + against_votes ≥ quorum`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shadow_core::{Address, BlockNumber, ParameterChange, ProposalId};

use crate::action::ProposalAction;

// ─── Proposal State ──────────────────────────────────────────────────

/// The lifecycle state of a proposal at a given block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalState {
    /// Created, voting not yet open.
    Pending,
    /// Accepting votes.
    Active,
    /// Voting closed without meeting quorum or majority.
    Defeated,
    /// Voting closed with quorum and majority; awaiting execution.
    Succeeded,
    /// Changes applied (terminal).
    Executed,
    /// Withdrawn before execution (terminal).
    Canceled,
}

impl ProposalState {
    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Executed | Self::Canceled)
    }

    /// Whether the proposal still blocks its proposer from proposing again.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Pending | Self::Active)
    }
}

impl std::fmt::Display for ProposalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Active => "ACTIVE",
            Self::Defeated => "DEFEATED",
            Self::Succeeded => "SUCCEEDED",
            Self::Executed => "EXECUTED",
            Self::Canceled => "CANCELED",
        };
        f.write_str(s)
    }
}

// ─── Records ─────────────────────────────────────────────────────────

/// A cast vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// `true` for, `false` against.
    pub support: bool,
    /// Weight counted.
    pub votes: u128,
}

/// Record of a recorded state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalTransitionRecord {
    /// State after the transition.
    pub to_state: ProposalState,
    /// Block the transition happened in.
    pub block: BlockNumber,
    /// Account that triggered it.
    pub actor: Address,
    /// Wall-clock time it was recorded.
    pub timestamp: DateTime<Utc>,
}

// ─── Proposal ────────────────────────────────────────────────────────

/// A governance proposal with its tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub proposer: Address,
    pub description: String,
    pub actions: Vec<ProposalAction>,
    /// First block votes are accepted.
    pub start_block: BlockNumber,
    /// First block votes are no longer accepted.
    pub end_block: BlockNumber,
    /// Quorum in force when the proposal was created.
    pub quorum_votes: u128,
    pub for_votes: u128,
    pub against_votes: u128,
    pub executed: bool,
    pub canceled: bool,
    pub receipts: BTreeMap<Address, Receipt>,
    /// Recorded transitions, oldest first.
    pub transitions: Vec<ProposalTransitionRecord>,
}

impl Proposal {
    /// The lifecycle state at `block`.
    pub fn state_at(&self, block: BlockNumber) -> ProposalState {
        if self.canceled {
            ProposalState::Canceled
        } else if self.executed {
            ProposalState::Executed
        } else if block < self.start_block {
            ProposalState::Pending
        } else if block < self.end_block {
            ProposalState::Active
        } else if self.for_votes > self.against_votes
            && self.for_votes.saturating_add(self.against_votes) >= self.quorum_votes
        {
            ProposalState::Succeeded
        } else {
            ProposalState::Defeated
        }
    }

    /// The vote cast by `voter`, if any.
    pub fn receipt(&self, voter: &Address) -> Option<&Receipt> {
        self.receipts.get(voter)
    }

    /// Decoded parameter changes, in action order.
    pub fn changes(&self) -> impl Iterator<Item = &ParameterChange> {
        self.actions.iter().map(|a| &a.change)
    }

    pub(crate) fn record(&mut self, to_state: ProposalState, block: BlockNumber, actor: Address) {
        self.transitions.push(ProposalTransitionRecord {
            to_state,
            block,
            actor,
            timestamp: Utc::now(),
        });
    }
}
