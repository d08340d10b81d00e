//! # DAO Facade
//!
//! [`ShadowProtocol`] bundles one pool, one governance engine and one voting
//! ledger. Executed fee changes are scheduled in the pool's shared
//! registry and logged as `ParametersUpdated` events; governance changes
//! (voting period, quorum, threshold) update the engine. Governance never
//! reaches the tree or the nullifier set.
//!
//! Lock order: voting ledger, governance engine, fee registry, pool state.

use parking_lot::{Mutex, RwLock};
use shadow_core::{
    Address, BlockNumber, FeeParameterVersion, ParameterChange, ProposalId, ProtocolConfig,
};
use shadow_state::{
    GovernanceEngine, Proposal, ProposalState, Receipt, VotingLedger, VotingPower,
};
use shadow_zkp::ProofBackend;

use crate::error::PoolError;
use crate::ledger::{PoolEvent, ShadowPool};

/// Pool plus the DAO that governs its parameters.
#[derive(Debug)]
pub struct ShadowProtocol<B: ProofBackend> {
    pool: ShadowPool<B>,
    governance: Mutex<GovernanceEngine>,
    voting: RwLock<VotingLedger>,
}

impl<B: ProofBackend> ShadowProtocol<B> {
    pub fn new(
        config: &ProtocolConfig,
        backend: B,
        verifying_key: B::VerifyingKey,
    ) -> Result<Self, PoolError> {
        config.validate()?;
        let pool = ShadowPool::new(config.pool.clone(), backend, verifying_key)?;
        let governance = GovernanceEngine::from_config(&config.governance)?;
        Ok(Self::from_parts(pool, governance, VotingLedger::new()))
    }

    /// Assemble from existing components, e.g. restored snapshots.
    pub fn from_parts(
        pool: ShadowPool<B>,
        governance: GovernanceEngine,
        voting: VotingLedger,
    ) -> Self {
        Self {
            pool,
            governance: Mutex::new(governance),
            voting: RwLock::new(voting),
        }
    }

    pub fn pool(&self) -> &ShadowPool<B> {
        &self.pool
    }

    // ── Voting weight ────────────────────────────────────────────────

    /// Set `account`'s voting weight from `block` on.
    pub fn set_votes(
        &self,
        account: Address,
        block: BlockNumber,
        votes: u128,
    ) -> Result<(), PoolError> {
        Ok(self.voting.write().set_votes(account, block, votes)?)
    }

    pub fn votes_at(&self, account: &Address, block: BlockNumber) -> u128 {
        self.voting.read().votes_at(account, block)
    }

    // ── Governance surface ───────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    pub fn propose(
        &self,
        proposer: Address,
        targets: Vec<Address>,
        values: Vec<u128>,
        signatures: Vec<String>,
        calldatas: Vec<Vec<u8>>,
        description: &str,
        block: BlockNumber,
    ) -> Result<ProposalId, PoolError> {
        let voting = self.voting.read();
        Ok(self.governance.lock().propose(
            &*voting,
            proposer,
            targets,
            values,
            signatures,
            calldatas,
            description,
            block,
        )?)
    }

    /// Vote with the voter's weight at the proposal's start block.
    pub fn cast_vote(
        &self,
        id: ProposalId,
        voter: Address,
        support: bool,
        block: BlockNumber,
    ) -> Result<Receipt, PoolError> {
        let voting = self.voting.read();
        Ok(self
            .governance
            .lock()
            .cast_vote(&*voting, id, voter, support, block)?)
    }

    /// Execute a succeeded proposal.
    ///
    /// Fee changes take effect from `block + 1`.
    pub fn execute(
        &self,
        id: ProposalId,
        caller: Address,
        block: BlockNumber,
    ) -> Result<Vec<ParameterChange>, PoolError> {
        let mut governance = self.governance.lock();
        let (changes, scheduled) = {
            let mut registry = self.pool.registry().write();
            let before = registry.current().version;
            let changes = governance.execute(id, caller, block, &mut *registry)?;
            let scheduled: Vec<FeeParameterVersion> = registry
                .history()
                .iter()
                .filter(|v| v.version > before)
                .copied()
                .collect();
            (changes, scheduled)
        };
        drop(governance);

        for version in scheduled {
            self.pool.record_event(PoolEvent::ParametersUpdated {
                version: version.version,
                effective_from: version.effective_from,
                params: version.params,
                proposal: Some(id),
                block,
            });
        }
        Ok(changes)
    }

    pub fn cancel(
        &self,
        id: ProposalId,
        caller: Address,
        block: BlockNumber,
    ) -> Result<(), PoolError> {
        let voting = self.voting.read();
        Ok(self.governance.lock().cancel(&*voting, id, caller, block)?)
    }

    pub fn state(&self, id: ProposalId, block: BlockNumber) -> Result<ProposalState, PoolError> {
        Ok(self.governance.lock().state(id, block)?)
    }

    pub fn proposal(&self, id: ProposalId) -> Option<Proposal> {
        self.governance.lock().proposal(id).cloned()
    }

    pub fn active_proposal_count(&self, block: BlockNumber) -> usize {
        self.governance.lock().active_proposal_count(block)
    }

    pub fn proposal_threshold(&self) -> u128 {
        self.governance.lock().proposal_threshold()
    }

    pub fn voting_period(&self) -> u64 {
        self.governance.lock().voting_period()
    }

    pub fn voting_delay(&self) -> u64 {
        self.governance.lock().voting_delay()
    }

    pub fn quorum_votes(&self) -> u128 {
        self.governance.lock().quorum_votes()
    }

    /// Copy of the governance state, for persistence.
    pub fn governance_snapshot(&self) -> GovernanceEngine {
        self.governance.lock().clone()
    }
}
