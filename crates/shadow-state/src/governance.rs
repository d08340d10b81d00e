//! # Governance Engine
//!
//! GovernorAlpha-style proposal lifecycle over the protocol parameters.
//!
//! ## Operations
//!
//! - `propose`: proposer weight at `block - 1` must reach the threshold;
//!   actions are decoded up front; one live proposal per proposer. Voting
//!   opens at `block + voting_delay` and closes `voting_period` blocks later.
//! - `vote` / `cast_vote`: one vote per voter while Active. `cast_vote`
//!   reads the voter's weight at the proposal's start block.
//! - `execute`: only from Succeeded, only once. Every change is checked
//!   before any is applied.
//! - `cancel`: by the guardian, by the proposer, or by anyone once the
//!   proposer's weight has dropped below the threshold. Never after
//!   execution.
//!
//! Every failed call leaves the engine unchanged.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shadow_core::{
    Address, BlockNumber, GovernanceConfig, GovernanceParameters, ParameterChange, ParameterSink,
    ProposalId,
};

use crate::action::{decode_action, ProposalAction};
use crate::error::GovernanceError;
use crate::proposal::{Proposal, ProposalState, Receipt};
use crate::voting::VotingPower;

/// Proposal store and lifecycle rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceEngine {
    params: GovernanceParameters,
    guardian: Address,
    proposals: BTreeMap<ProposalId, Proposal>,
    latest_proposal: BTreeMap<Address, ProposalId>,
    next_id: u64,
}

impl GovernanceEngine {
    /// An engine with no proposals.
    pub fn new(params: GovernanceParameters, guardian: Address) -> Result<Self, GovernanceError> {
        params.validate()?;
        Ok(Self {
            params,
            guardian,
            proposals: BTreeMap::new(),
            latest_proposal: BTreeMap::new(),
            next_id: 1,
        })
    }

    /// An engine configured from `config`.
    pub fn from_config(config: &GovernanceConfig) -> Result<Self, GovernanceError> {
        Self::new(config.parameters(), config.guardian)
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn parameters(&self) -> &GovernanceParameters {
        &self.params
    }

    pub fn proposal_threshold(&self) -> u128 {
        self.params.proposal_threshold
    }

    pub fn voting_period(&self) -> u64 {
        self.params.voting_period
    }

    pub fn voting_delay(&self) -> u64 {
        self.params.voting_delay
    }

    pub fn quorum_votes(&self) -> u128 {
        self.params.quorum_votes
    }

    pub fn guardian(&self) -> Address {
        self.guardian
    }

    pub fn proposal(&self, id: ProposalId) -> Option<&Proposal> {
        self.proposals.get(&id)
    }

    /// All proposals in id order.
    pub fn proposals(&self) -> impl Iterator<Item = &Proposal> {
        self.proposals.values()
    }

    pub fn proposal_count(&self) -> usize {
        self.proposals.len()
    }

    /// Number of proposals accepting votes at `block`.
    pub fn active_proposal_count(&self, block: BlockNumber) -> usize {
        self.proposals
            .values()
            .filter(|p| p.state_at(block) == ProposalState::Active)
            .count()
    }

    /// The state of proposal `id` at `block`.
    pub fn state(&self, id: ProposalId, block: BlockNumber) -> Result<ProposalState, GovernanceError> {
        Ok(self.get(id)?.state_at(block))
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Create a proposal.
    ///
    /// # Errors
    ///
    /// `BelowProposalThreshold` if the proposer's weight at `block - 1` is
    /// below the threshold; shape and decoding errors for malformed actions;
    /// `ProposerHasLiveProposal` if the proposer already has one pending or
    /// active.
    #[allow(clippy::too_many_arguments)]
    pub fn propose(
        &mut self,
        power: &impl VotingPower,
        proposer: Address,
        targets: Vec<Address>,
        values: Vec<u128>,
        signatures: Vec<String>,
        calldatas: Vec<Vec<u8>>,
        description: &str,
        block: BlockNumber,
    ) -> Result<ProposalId, GovernanceError> {
        let votes = power.votes_at(&proposer, block.saturating_sub(1));
        if votes < self.params.proposal_threshold {
            return Err(GovernanceError::BelowProposalThreshold {
                proposer,
                votes,
                threshold: self.params.proposal_threshold,
            });
        }
        let n = targets.len();
        if values.len() != n || signatures.len() != n || calldatas.len() != n {
            return Err(GovernanceError::ArityMismatch {
                targets: n,
                values: values.len(),
                signatures: signatures.len(),
                calldatas: calldatas.len(),
            });
        }
        if n == 0 {
            return Err(GovernanceError::NoActions);
        }
        if n > self.params.max_operations {
            return Err(GovernanceError::TooManyActions {
                count: n,
                max: self.params.max_operations,
            });
        }
        if let Some(existing) = self.latest_proposal.get(&proposer) {
            if let Some(p) = self.proposals.get(existing) {
                if p.state_at(block).is_live() {
                    return Err(GovernanceError::ProposerHasLiveProposal {
                        proposer,
                        existing: *existing,
                    });
                }
            }
        }

        let mut actions = Vec::with_capacity(n);
        let tuples = targets.into_iter().zip(values).zip(signatures).zip(calldatas);
        for (index, (((target, value), signature), calldata)) in tuples.enumerate() {
            if value != 0 {
                return Err(GovernanceError::NonZeroValue { index, value });
            }
            let change = decode_action(&signature, &calldata)?;
            actions.push(ProposalAction {
                target,
                value,
                signature,
                calldata,
                change,
            });
        }

        let start_block = block
            .checked_add(self.params.voting_delay)
            .ok_or(GovernanceError::BlockOverflow(block))?;
        let end_block = start_block
            .checked_add(self.params.voting_period)
            .ok_or(GovernanceError::BlockOverflow(block))?;

        let id = ProposalId(self.next_id);
        let mut proposal = Proposal {
            id,
            proposer,
            description: description.to_string(),
            actions,
            start_block,
            end_block,
            quorum_votes: self.params.quorum_votes,
            for_votes: 0,
            against_votes: 0,
            executed: false,
            canceled: false,
            receipts: BTreeMap::new(),
            transitions: Vec::new(),
        };
        proposal.record(ProposalState::Pending, block, proposer);
        self.proposals.insert(id, proposal);
        self.latest_proposal.insert(proposer, id);
        self.next_id += 1;

        tracing::info!(
            proposal = %id,
            proposer = %proposer,
            start_block,
            end_block,
            actions = n,
            "proposal created"
        );
        Ok(id)
    }

    /// Record a vote with an explicit weight.
    ///
    /// # Errors
    ///
    /// `ProposalNotActive` outside `[start_block, end_block)` or once the
    /// proposal is canceled or executed; `AlreadyVoted` on a repeat vote.
    pub fn vote(
        &mut self,
        id: ProposalId,
        voter: Address,
        support: bool,
        weight: u128,
        block: BlockNumber,
    ) -> Result<Receipt, GovernanceError> {
        let proposal = self
            .proposals
            .get_mut(&id)
            .ok_or(GovernanceError::UnknownProposal(id))?;
        let state = proposal.state_at(block);
        if state != ProposalState::Active {
            return Err(GovernanceError::ProposalNotActive { id, state });
        }
        if proposal.receipts.contains_key(&voter) {
            return Err(GovernanceError::AlreadyVoted { id, voter });
        }
        if support {
            proposal.for_votes = proposal.for_votes.saturating_add(weight);
        } else {
            proposal.against_votes = proposal.against_votes.saturating_add(weight);
        }
        let receipt = Receipt {
            support,
            votes: weight,
        };
        proposal.receipts.insert(voter, receipt);
        tracing::debug!(proposal = %id, voter = %voter, support, weight, "vote cast");
        Ok(receipt)
    }

    /// Vote with the voter's weight at the proposal's start block.
    pub fn cast_vote(
        &mut self,
        power: &impl VotingPower,
        id: ProposalId,
        voter: Address,
        support: bool,
        block: BlockNumber,
    ) -> Result<Receipt, GovernanceError> {
        let start_block = self.get(id)?.start_block;
        let weight = power.votes_at(&voter, start_block);
        self.vote(id, voter, support, weight, block)
    }

    /// Apply a succeeded proposal's changes.
    ///
    /// Governance changes are applied to this engine; everything else goes
    /// to `sink`. All changes are checked first, so either every change is
    /// applied or none is.
    ///
    /// # Errors
    ///
    /// `AlreadyExecuted` on re-execution; `NotSucceeded` unless the
    /// proposal is Succeeded at `block`; a parameter error if any change is
    /// invalid.
    pub fn execute(
        &mut self,
        id: ProposalId,
        caller: Address,
        block: BlockNumber,
        sink: &mut dyn ParameterSink,
    ) -> Result<Vec<ParameterChange>, GovernanceError> {
        let proposal = self.get(id)?;
        if proposal.executed {
            return Err(GovernanceError::AlreadyExecuted(id));
        }
        let state = proposal.state_at(block);
        if state != ProposalState::Succeeded {
            return Err(GovernanceError::NotSucceeded { id, state });
        }
        let changes: Vec<ParameterChange> = proposal.changes().copied().collect();

        // Dry run: governance changes on a copy, the rest through the sink's check.
        let mut next_params = self.params;
        let mut external = Vec::with_capacity(changes.len());
        for change in &changes {
            if !next_params.apply_change(change, block)? {
                sink.check_change(change, block)?;
                external.push(change);
            }
        }
        next_params.validate()?;

        for change in external {
            sink.apply_change(change, block)?;
        }
        self.params = next_params;

        if let Some(p) = self.proposals.get_mut(&id) {
            p.executed = true;
            p.record(ProposalState::Executed, block, caller);
        }
        tracing::info!(proposal = %id, changes = changes.len(), block, "proposal executed");
        Ok(changes)
    }

    /// Cancel a proposal that has not been executed.
    pub fn cancel(
        &mut self,
        power: &impl VotingPower,
        id: ProposalId,
        caller: Address,
        block: BlockNumber,
    ) -> Result<(), GovernanceError> {
        let proposal = self.get(id)?;
        if proposal.executed {
            return Err(GovernanceError::AlreadyExecuted(id));
        }
        if proposal.canceled {
            return Err(GovernanceError::AlreadyCanceled(id));
        }
        let is_guardian = !self.guardian.is_zero() && caller == self.guardian;
        let proposer_weight = power.votes_at(&proposal.proposer, block.saturating_sub(1));
        let authorized = is_guardian
            || caller == proposal.proposer
            || proposer_weight < self.params.proposal_threshold;
        if !authorized {
            return Err(GovernanceError::NotAuthorizedToCancel { id, caller });
        }
        if let Some(p) = self.proposals.get_mut(&id) {
            p.canceled = true;
            p.record(ProposalState::Canceled, block, caller);
        }
        tracing::info!(proposal = %id, caller = %caller, "proposal canceled");
        Ok(())
    }

    fn get(&self, id: ProposalId) -> Result<&Proposal, GovernanceError> {
        self.proposals
            .get(&id)
            .ok_or(GovernanceError::UnknownProposal(id))
    }
}
