//! # Pool Ledger
//!
//! [`PoolLedger`] is the surface a UI or ledger runtime talks to.
//! [`ShadowPool`] is the in-process implementation: one Merkle accumulator,
//! one spent-nullifier set, per-account balances and an event log, all
//! behind a single `parking_lot::Mutex` so every entry point is one
//! serialized transition. The fee registry sits behind its own
//! `Arc<RwLock<_>>` because governance writes it while the pool reads it.
//!
//! ## Deposits
//!
//! `deposit_with_proof` is the authoritative path: the proof attests the
//! commitment is well formed for the stated amount, and the depositor may
//! pin the root the tree must have after insertion. The value-only
//! `deposit` path accepts a bare commitment and is disabled unless
//! `allow_legacy_deposits` is set.
//!
//! ## Lock order
//!
//! `state` before `registry`. Nothing takes `state` while holding the
//! registry lock.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use shadow_core::{
    Address, Amount, BlockNumber, FeeParameterVersion, FeeParameters, FieldElement,
    ParameterRegistry, PoolConfig, ProposalId,
};
use shadow_crypto::{Commitment, MerkleAccumulator, MerkleProof, NullifierHash};
use shadow_zkp::{DepositPublicInputs, ProofBackend, PublicInputs, WithdrawPublicInputs};

use crate::error::PoolError;
use crate::nullifier::SpentNullifiers;
use crate::stats::{AnonymityLevel, PoolStats};
use crate::withdraw::WithdrawalReceipt;

// ─── Transactions ────────────────────────────────────────────────────

/// Who submitted a transaction, what it carried, and when.
///
/// `submitted_at` selects the fee schedule; `included_at` is the block the
/// ledger executes it in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxContext {
    pub sender: Address,
    /// Value transferred with the transaction.
    pub value: Amount,
    pub submitted_at: BlockNumber,
    pub included_at: BlockNumber,
}

impl TxContext {
    /// A zero-value transaction submitted and included at `block`.
    pub fn new(sender: Address, block: BlockNumber) -> Self {
        Self {
            sender,
            value: Amount::ZERO,
            submitted_at: block,
            included_at: block,
        }
    }

    pub fn with_value(mut self, value: Amount) -> Self {
        self.value = value;
        self
    }

    /// Set the inclusion block, keeping the submission block.
    pub fn included_at(mut self, block: BlockNumber) -> Self {
        self.included_at = block;
        self
    }

    /// Reject timing the pool's block clock cannot accept: a submission
    /// after inclusion, an inclusion block before the last applied one, or
    /// more than `max_lag` blocks between submission and inclusion.
    pub(crate) fn check_timing(
        &self,
        last_block: BlockNumber,
        max_lag: u64,
    ) -> Result<(), PoolError> {
        if self.submitted_at > self.included_at {
            return Err(PoolError::FutureSubmission {
                submitted_at: self.submitted_at,
                included_at: self.included_at,
            });
        }
        if self.included_at < last_block {
            return Err(PoolError::BlockRegression {
                included_at: self.included_at,
                last_block,
            });
        }
        if self.included_at - self.submitted_at > max_lag {
            return Err(PoolError::SubmissionExpired {
                submitted_at: self.submitted_at,
                included_at: self.included_at,
                max_lag,
            });
        }
        Ok(())
    }
}

/// Result of an accepted deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositReceipt {
    pub commitment: Commitment,
    pub leaf_index: u64,
    /// Root after insertion.
    pub root: FieldElement,
    pub block: BlockNumber,
}

/// Entries of the pool's append-only event log, keyed by event name on
/// the wire (`{"deposit": {...}}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolEvent {
    Deposit {
        commitment: Commitment,
        leaf_index: u64,
        root: FieldElement,
        amount: Amount,
        block: BlockNumber,
    },
    Withdrawal {
        nullifier_hash: NullifierHash,
        recipient: Address,
        amount: Amount,
        fee: Amount,
        block: BlockNumber,
    },
    ParametersUpdated {
        version: u32,
        effective_from: BlockNumber,
        params: FeeParameters,
        proposal: Option<ProposalId>,
        block: BlockNumber,
    },
}

// ─── Ledger Interface ────────────────────────────────────────────────

/// Entry points of a shadow pool.
pub trait PoolLedger: Send + Sync {
    /// Proof type accepted by `deposit_with_proof` and `withdraw`.
    type Proof;

    /// Value-only deposit of `commitment` carrying `ctx.value`.
    fn deposit(&self, commitment: Commitment, ctx: &TxContext)
        -> Result<DepositReceipt, PoolError>;

    /// Proof-backed deposit.
    fn deposit_with_proof(
        &self,
        proof: &Self::Proof,
        inputs: &DepositPublicInputs,
        ctx: &TxContext,
    ) -> Result<DepositReceipt, PoolError>;

    /// Spend a note.
    fn withdraw(
        &self,
        proof: &Self::Proof,
        inputs: &WithdrawPublicInputs,
        ctx: &TxContext,
    ) -> Result<WithdrawalReceipt, PoolError>;

    fn current_root(&self) -> FieldElement;

    /// Path from leaf `index` to the current root.
    fn merkle_path(&self, index: u64) -> Result<MerkleProof, PoolError>;

    /// Fee schedule in force at `block`.
    fn fee_parameters_at(&self, block: BlockNumber) -> FeeParameters;

    /// Whether `nullifier` has been spent.
    fn is_spent(&self, nullifier: &NullifierHash) -> bool;

    fn get_pool_stats(&self) -> PoolStats;

    fn get_anonymity_level(&self) -> AnonymityLevel;

    /// Filled leaves as a percentage of capacity.
    fn get_pool_utilization(&self) -> f64;
}

// ─── In-process Ledger ───────────────────────────────────────────────

/// Everything a transition mutates.
#[derive(Debug)]
pub(crate) struct PoolState {
    pub(crate) tree: MerkleAccumulator,
    pub(crate) commitments: BTreeSet<FieldElement>,
    pub(crate) nullifiers: SpentNullifiers,
    pub(crate) balances: BTreeMap<Address, Amount>,
    pub(crate) total_value_locked: Amount,
    pub(crate) events: Vec<PoolEvent>,
    /// Inclusion block of the last applied transition.
    pub(crate) last_block: BlockNumber,
}

/// In-process shadow pool over a proof backend `B`.
pub struct ShadowPool<B: ProofBackend> {
    pub(crate) backend: B,
    pub(crate) verifying_key: B::VerifyingKey,
    pub(crate) config: PoolConfig,
    pub(crate) registry: Arc<RwLock<ParameterRegistry>>,
    pub(crate) state: Mutex<PoolState>,
}

impl<B: ProofBackend> std::fmt::Debug for ShadowPool<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShadowPool")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<B: ProofBackend> ShadowPool<B> {
    /// An empty pool.
    pub fn new(
        config: PoolConfig,
        backend: B,
        verifying_key: B::VerifyingKey,
    ) -> Result<Self, PoolError> {
        config.validate()?;
        let tree = MerkleAccumulator::new(config.tree_depth, config.root_history_size)?;
        let registry = ParameterRegistry::new(config.initial_fee)?;
        tracing::info!(
            tree_depth = config.tree_depth,
            root_history_size = config.root_history_size,
            legacy_deposits = config.allow_legacy_deposits,
            "shadow pool created"
        );
        Ok(Self::from_parts(
            config,
            backend,
            verifying_key,
            registry,
            PoolState {
                tree,
                commitments: BTreeSet::new(),
                nullifiers: SpentNullifiers::new(),
                balances: BTreeMap::new(),
                total_value_locked: Amount::ZERO,
                events: Vec::new(),
                last_block: 0,
            },
        ))
    }

    pub(crate) fn from_parts(
        config: PoolConfig,
        backend: B,
        verifying_key: B::VerifyingKey,
        registry: ParameterRegistry,
        state: PoolState,
    ) -> Self {
        Self {
            backend,
            verifying_key,
            config,
            registry: Arc::new(RwLock::new(registry)),
            state: Mutex::new(state),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// The shared fee registry.
    pub fn registry(&self) -> &Arc<RwLock<ParameterRegistry>> {
        &self.registry
    }

    /// The fee version in force at `block`.
    pub fn fee_version_at(&self, block: BlockNumber) -> FeeParameterVersion {
        *self.registry.read().version_at(block)
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.state
            .lock()
            .balances
            .get(account)
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    pub fn total_value_locked(&self) -> Amount {
        self.state.lock().total_value_locked
    }

    pub fn leaf_count(&self) -> u64 {
        self.state.lock().tree.leaf_count()
    }

    /// Inclusion block of the last applied deposit or withdrawal.
    pub fn last_block(&self) -> BlockNumber {
        self.state.lock().last_block
    }

    pub fn is_known_root(&self, root: &FieldElement) -> bool {
        self.state.lock().tree.is_known_root(root)
    }

    pub fn is_spent(&self, nullifier: &NullifierHash) -> bool {
        self.state.lock().nullifiers.is_spent(nullifier)
    }

    /// Path from leaf `index` to a retained historical `root`.
    pub fn path_at(&self, index: u64, root: &FieldElement) -> Result<MerkleProof, PoolError> {
        Ok(self.state.lock().tree.path_at(index, root)?)
    }

    /// Events from position `cursor` on, and the cursor to resume from.
    pub fn events_since(&self, cursor: usize) -> (Vec<PoolEvent>, usize) {
        let state = self.state.lock();
        let from = cursor.min(state.events.len());
        (state.events[from..].to_vec(), state.events.len())
    }

    pub(crate) fn record_event(&self, event: PoolEvent) {
        self.state.lock().events.push(event);
    }

    /// Reject a commitment before any state is touched.
    fn check_commitment(
        &self,
        state: &PoolState,
        commitment: &Commitment,
        amount: Amount,
        ctx: &TxContext,
    ) -> Result<(), PoolError> {
        ctx.check_timing(state.last_block, self.config.max_submission_lag)?;
        if amount.is_zero() {
            return Err(PoolError::InvalidAmount {
                amount,
                reason: "deposit amount must be positive".to_string(),
            });
        }
        if ctx.value != amount {
            return Err(PoolError::InvalidAmount {
                amount,
                reason: format!("transaction carries {}", ctx.value),
            });
        }
        if commitment.0.is_zero() {
            return Err(PoolError::InvalidCommitment);
        }
        if state.commitments.contains(&commitment.0) {
            return Err(PoolError::DuplicateCommitment(commitment.0));
        }
        Ok(())
    }

    /// Insert a checked commitment. Either everything is updated or nothing.
    fn insert_commitment(
        state: &mut PoolState,
        commitment: Commitment,
        amount: Amount,
        ctx: &TxContext,
    ) -> Result<DepositReceipt, PoolError> {
        let tvl = state
            .total_value_locked
            .checked_add(amount)
            .ok_or(PoolError::BalanceOverflow(ctx.sender))?;
        let (leaf_index, root) = state.tree.insert(commitment.0)?;
        state.commitments.insert(commitment.0);
        state.total_value_locked = tvl;
        state.last_block = ctx.included_at;
        state.events.push(PoolEvent::Deposit {
            commitment,
            leaf_index,
            root,
            amount,
            block: ctx.included_at,
        });
        tracing::info!(leaf_index, root = %root, amount = %amount, "deposit accepted");
        Ok(DepositReceipt {
            commitment,
            leaf_index,
            root,
            block: ctx.included_at,
        })
    }
}

impl<B: ProofBackend> PoolLedger for ShadowPool<B> {
    type Proof = B::Proof;

    fn deposit(
        &self,
        commitment: Commitment,
        ctx: &TxContext,
    ) -> Result<DepositReceipt, PoolError> {
        if !self.config.allow_legacy_deposits {
            return Err(PoolError::LegacyDepositsDisabled);
        }
        let mut state = self.state.lock();
        self.check_commitment(&state, &commitment, ctx.value, ctx)?;
        tracing::warn!(
            sender = %ctx.sender,
            "value-only deposit accepted without a well-formedness proof"
        );
        Self::insert_commitment(&mut state, commitment, ctx.value, ctx)
    }

    fn deposit_with_proof(
        &self,
        proof: &Self::Proof,
        inputs: &DepositPublicInputs,
        ctx: &TxContext,
    ) -> Result<DepositReceipt, PoolError> {
        let mut state = self.state.lock();
        self.check_commitment(&state, &inputs.commitment, inputs.amount, ctx)?;
        if let Some(expected) = inputs.root_after {
            let actual = state.tree.preview_root(inputs.commitment.0)?;
            if actual != expected {
                return Err(PoolError::RootMismatch { expected, actual });
            }
        }
        let public = PublicInputs::Deposit(*inputs);
        if !self.backend.verify(&self.verifying_key, proof, &public)? {
            return Err(PoolError::InvalidProof("deposit proof rejected".to_string()));
        }
        Self::insert_commitment(&mut state, inputs.commitment, inputs.amount, ctx)
    }

    fn withdraw(
        &self,
        proof: &Self::Proof,
        inputs: &WithdrawPublicInputs,
        ctx: &TxContext,
    ) -> Result<WithdrawalReceipt, PoolError> {
        self.process_withdrawal(proof, inputs, ctx)
    }

    fn current_root(&self) -> FieldElement {
        self.state.lock().tree.root()
    }

    fn merkle_path(&self, index: u64) -> Result<MerkleProof, PoolError> {
        Ok(self.state.lock().tree.path_for(index)?)
    }

    fn fee_parameters_at(&self, block: BlockNumber) -> FeeParameters {
        self.registry.read().at(block)
    }

    fn is_spent(&self, nullifier: &NullifierHash) -> bool {
        ShadowPool::is_spent(self, nullifier)
    }

    fn get_pool_stats(&self) -> PoolStats {
        self.stats()
    }

    fn get_anonymity_level(&self) -> AnonymityLevel {
        AnonymityLevel::for_deposits(self.leaf_count())
    }

    fn get_pool_utilization(&self) -> f64 {
        self.utilization()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shadow_crypto::{DepositNote, RecipientBinding};
    use shadow_zkp::{CircuitInputs, MockProofBackend, MockProvingKey};

    const DEPOSITOR: Address = Address::new([0xd0; 20]);

    fn pool(config: PoolConfig) -> (ShadowPool<MockProofBackend>, MockProvingKey) {
        let (pk, vk) = MockProofBackend::setup(b"ledger-tests");
        (ShadowPool::new(config, MockProofBackend::new(), vk).unwrap(), pk)
    }

    fn small() -> PoolConfig {
        PoolConfig {
            tree_depth: 3,
            root_history_size: 4,
            ..PoolConfig::default()
        }
    }

    fn note(amount: u128) -> DepositNote {
        DepositNote::generate(&mut rand_core::OsRng, Amount(amount), RecipientBinding::unbound())
    }

    fn prove_deposit(
        pk: &MockProvingKey,
        note: &DepositNote,
        root_after: Option<FieldElement>,
    ) -> (shadow_zkp::MockProof, DepositPublicInputs) {
        let (proof, public) = MockProofBackend::new()
            .generate_proof(
                pk,
                &CircuitInputs::Deposit {
                    note: note.clone(),
                    root_after,
                },
            )
            .unwrap();
        match public {
            PublicInputs::Deposit(d) => (proof, d),
            PublicInputs::Withdraw(_) => unreachable!(),
        }
    }

    #[test]
    fn proof_backed_deposit_inserts_and_logs() {
        let (pool, pk) = pool(small());
        let n = note(1_000);
        let (proof, inputs) = prove_deposit(&pk, &n, None);
        let ctx = TxContext::new(DEPOSITOR, 5).with_value(Amount(1_000));
        let receipt = pool.deposit_with_proof(&proof, &inputs, &ctx).unwrap();
        assert_eq!(receipt.leaf_index, 0);
        assert_eq!(receipt.root, pool.current_root());
        assert_eq!(pool.total_value_locked(), Amount(1_000));
        let (events, cursor) = pool.events_since(0);
        assert_eq!(cursor, 1);
        assert!(matches!(events[0], PoolEvent::Deposit { leaf_index: 0, .. }));
        assert!(pool.events_since(cursor).0.is_empty());
    }

    #[test]
    fn pinned_root_must_match() {
        let (pool, pk) = pool(small());
        let n = note(10);
        let wrong = FieldElement::from_u64(3);
        let (proof, inputs) = prove_deposit(&pk, &n, Some(wrong));
        let ctx = TxContext::new(DEPOSITOR, 1).with_value(Amount(10));
        let err = pool.deposit_with_proof(&proof, &inputs, &ctx).unwrap_err();
        assert!(matches!(err, PoolError::RootMismatch { .. }));
        assert_eq!(pool.leaf_count(), 0);
    }

    #[test]
    fn pinned_root_is_accepted_when_correct() {
        let (pool, pk) = pool(small());
        let n = note(10);
        let expected = {
            let state = pool.state.lock();
            state.tree.preview_root(n.commitment().unwrap().0).unwrap()
        };
        let (proof, inputs) = prove_deposit(&pk, &n, Some(expected));
        let ctx = TxContext::new(DEPOSITOR, 1).with_value(Amount(10));
        let receipt = pool.deposit_with_proof(&proof, &inputs, &ctx).unwrap();
        assert_eq!(receipt.root, expected);
    }

    #[test]
    fn tampered_deposit_proof_is_rejected() {
        let (pool, pk) = pool(small());
        let n = note(10);
        let (proof, mut inputs) = prove_deposit(&pk, &n, None);
        inputs.amount = Amount(11);
        let ctx = TxContext::new(DEPOSITOR, 1).with_value(Amount(11));
        let err = pool.deposit_with_proof(&proof, &inputs, &ctx).unwrap_err();
        assert_eq!(err.kind(), shadow_core::ErrorKind::InvalidProof);
        assert_eq!(pool.total_value_locked(), Amount::ZERO);
    }

    #[test]
    fn value_must_match_amount() {
        let (pool, pk) = pool(small());
        let n = note(10);
        let (proof, inputs) = prove_deposit(&pk, &n, None);
        let ctx = TxContext::new(DEPOSITOR, 1).with_value(Amount(9));
        assert!(matches!(
            pool.deposit_with_proof(&proof, &inputs, &ctx),
            Err(PoolError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn duplicate_commitment_is_rejected() {
        let (pool, pk) = pool(small());
        let n = note(10);
        let (proof, inputs) = prove_deposit(&pk, &n, None);
        let ctx = TxContext::new(DEPOSITOR, 1).with_value(Amount(10));
        pool.deposit_with_proof(&proof, &inputs, &ctx).unwrap();
        assert!(matches!(
            pool.deposit_with_proof(&proof, &inputs, &ctx),
            Err(PoolError::DuplicateCommitment(_))
        ));
        assert_eq!(pool.leaf_count(), 1);
    }

    #[test]
    fn legacy_deposit_is_disabled_by_default() {
        let (pool, _) = pool(small());
        let c = note(10).commitment().unwrap();
        let ctx = TxContext::new(DEPOSITOR, 1).with_value(Amount(10));
        assert!(matches!(
            pool.deposit(c, &ctx),
            Err(PoolError::LegacyDepositsDisabled)
        ));
    }

    #[test]
    fn legacy_deposit_when_enabled() {
        let (pool, _) = pool(PoolConfig {
            allow_legacy_deposits: true,
            ..small()
        });
        let c = note(10).commitment().unwrap();
        let zero_value = TxContext::new(DEPOSITOR, 1);
        assert!(matches!(
            pool.deposit(c, &zero_value),
            Err(PoolError::InvalidAmount { .. })
        ));
        let receipt = pool.deposit(c, &zero_value.with_value(Amount(10))).unwrap();
        assert_eq!(receipt.leaf_index, 0);
        assert!(matches!(
            pool.deposit(Commitment(FieldElement::zero()), &zero_value.with_value(Amount(1))),
            Err(PoolError::InvalidCommitment)
        ));
    }

    #[test]
    fn full_tree_rejects_deposit_without_side_effects() {
        let (pool, _) = pool(PoolConfig {
            tree_depth: 1,
            allow_legacy_deposits: true,
            ..small()
        });
        for v in 1..=2 {
            let ctx = TxContext::new(DEPOSITOR, 1).with_value(Amount(1));
            pool.deposit(Commitment(FieldElement::from_u64(v)), &ctx)
                .unwrap();
        }
        let ctx = TxContext::new(DEPOSITOR, 1).with_value(Amount(1));
        let err = pool
            .deposit(Commitment(FieldElement::from_u64(3)), &ctx)
            .unwrap_err();
        assert_eq!(err.kind(), shadow_core::ErrorKind::TreeFull);
        assert_eq!(pool.total_value_locked(), Amount(2));
        assert_eq!(pool.events_since(0).1, 2);
    }

    #[test]
    fn inclusion_block_cannot_move_backwards() {
        let (pool, _) = pool(PoolConfig {
            allow_legacy_deposits: true,
            ..small()
        });
        let at = |block| TxContext::new(DEPOSITOR, block).with_value(Amount(1));
        pool.deposit(Commitment(FieldElement::from_u64(1)), &at(20))
            .unwrap();
        assert_eq!(pool.last_block(), 20);
        assert!(matches!(
            pool.deposit(Commitment(FieldElement::from_u64(2)), &at(19)),
            Err(PoolError::BlockRegression {
                included_at: 19,
                last_block: 20
            })
        ));
        pool.deposit(Commitment(FieldElement::from_u64(2)), &at(20))
            .unwrap();
        assert_eq!(pool.leaf_count(), 2);
    }

    #[test]
    fn submission_lag_is_bounded() {
        let (pool, _) = pool(PoolConfig {
            allow_legacy_deposits: true,
            max_submission_lag: 5,
            ..small()
        });
        let ctx = TxContext::new(DEPOSITOR, 10)
            .with_value(Amount(1))
            .included_at(16);
        assert!(matches!(
            pool.deposit(Commitment(FieldElement::from_u64(1)), &ctx),
            Err(PoolError::SubmissionExpired { max_lag: 5, .. })
        ));
        pool.deposit(Commitment(FieldElement::from_u64(1)), &ctx.included_at(15))
            .unwrap();
        assert_eq!(pool.last_block(), 15);
    }

    #[test]
    fn events_round_trip_through_json() {
        let events = vec![
            PoolEvent::Deposit {
                commitment: Commitment(FieldElement::from_u64(4)),
                leaf_index: 0,
                root: FieldElement::from_u64(5),
                amount: Amount(u128::MAX),
                block: 1,
            },
            PoolEvent::ParametersUpdated {
                version: 2,
                effective_from: 11,
                params: FeeParameters::new(50, Amount(10u128.pow(30))),
                proposal: Some(ProposalId(1)),
                block: 10,
            },
        ];
        let json = serde_json::to_string(&events).unwrap();
        assert!(json.contains("\"parameters_updated\":{"), "{json}");
        let back: Vec<PoolEvent> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, events);
    }

    #[test]
    fn future_submission_is_rejected() {
        let (pool, _) = pool(PoolConfig {
            allow_legacy_deposits: true,
            ..small()
        });
        let ctx = TxContext::new(DEPOSITOR, 10)
            .with_value(Amount(1))
            .included_at(9);
        assert!(matches!(
            pool.deposit(Commitment(FieldElement::from_u64(1)), &ctx),
            Err(PoolError::FutureSubmission { .. })
        ));
    }
}
