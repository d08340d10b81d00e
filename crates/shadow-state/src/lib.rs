//! # shadow-state — Governance State Machine
//!
//! Implements the DAO layer that owns the pool's tunable parameters.
//!
//! ## Modules
//!
//! - **Proposal** (`proposal.rs`): the proposal record and its lifecycle
//!   `Pending → Active → {Defeated | Succeeded} → {Executed | Canceled}`.
//!   Pending, Active, Defeated and Succeeded are evaluated from the current
//!   block; Executed and Canceled are recorded transitions.
//!
//! - **Action** (`action.rs`): decoding of `(target, value, signature,
//!   calldata)` tuples into typed [`ParameterChange`]s at proposal time.
//!
//! - **Voting** (`voting.rs`): the [`VotingPower`] capability and
//!   [`VotingLedger`], a checkpointed weight ledger answering "how many
//!   votes did this account hold at block `b`".
//!
//! - **Governance** (`governance.rs`): [`GovernanceEngine`] with `propose`,
//!   `vote`, `cast_vote`, `execute` and `cancel`.
//!
//! ## Design
//!
//! Governance never touches the Merkle tree or the nullifier set. Executing
//! a proposal writes new parameter records through a [`ParameterSink`];
//! the pool reads them.
//!
//! [`ParameterChange`]: shadow_core::ParameterChange
//! [`ParameterSink`]: shadow_core::ParameterSink

pub mod action;
pub mod error;
pub mod governance;
pub mod proposal;
pub mod voting;

// ─── Re-exports ─────────────────────────────────────────────────────

pub use action::{decode_action, encode_action, ProposalAction};
pub use error::GovernanceError;
pub use governance::GovernanceEngine;
pub use proposal::{Proposal, ProposalState, ProposalTransitionRecord, Receipt};
pub use voting::{Checkpoint, VotingLedger, VotingPower};
