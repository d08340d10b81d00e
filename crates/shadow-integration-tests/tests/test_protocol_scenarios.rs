//! # Protocol Scenarios
//!
//! The worked examples: fee arithmetic on a full deposit/withdraw cycle,
//! the proposal voting window, and tree capacity.

mod common;

use common::*;
use shadow_core::{
    Address, Amount, ErrorKind, FeeParameters, FieldElement, GovernanceParameters,
    ParameterChange, PoolConfig,
};
use shadow_crypto::{CryptoError, MerkleAccumulator};
use shadow_pool::{compute_fee, PoolLedger, TxContext};
use shadow_state::{encode_action, GovernanceEngine, ProposalState, VotingLedger};

// =========================================================================
// Fees
// =========================================================================

#[test]
fn one_unit_at_five_bps_plus_fixed_fee_nets_0_9985() {
    let (pool, pk) = pool(PoolConfig {
        tree_depth: 8,
        initial_fee: FeeParameters::new(5, units("0.001")),
        fee_recipient: RELAYER,
        ..PoolConfig::default()
    });
    let n = note(units("1.0"));
    let receipt = deposit(&pool, &pk, &n, 1);

    let (proof, inputs) = prove_current(&pool, &pk, &n, receipt.leaf_index, 2);
    assert_eq!(inputs.fee.format_units(), "0.0015");

    let withdrawal = pool
        .withdraw(&proof, &inputs, &TxContext::new(RELAYER, 2))
        .unwrap();
    assert_eq!(withdrawal.net_amount.format_units(), "0.9985");
    assert_eq!(pool.balance_of(&RECIPIENT), units("0.9985"));
    assert_eq!(pool.balance_of(&RELAYER), units("0.0015"));
}

#[test]
fn fifty_bps_charges_half_a_percent() {
    let fee = compute_fee(units("1.0"), &FeeParameters::new(50, units("0.001"))).unwrap();
    assert_eq!(fee.format_units(), "0.006");
}

// =========================================================================
// Proposal window
// =========================================================================

#[test]
fn proposal_at_block_1_000_000_is_active_for_100_blocks() {
    let proposer = Address::new([0xa1; 20]);
    let mut power = VotingLedger::new();
    power.set_votes(proposer, 0, 1).unwrap();
    let mut gov = GovernanceEngine::new(
        GovernanceParameters {
            voting_period: 100,
            ..GovernanceParameters::default()
        },
        Address::ZERO,
    )
    .unwrap();
    let (sig, data) = encode_action(&ParameterChange::SetPercentageFee {
        percentage_fee_bps: 5,
    });
    let id = gov
        .propose(
            &power,
            proposer,
            vec![Address::ZERO],
            vec![0],
            vec![sig],
            vec![data],
            "lower the fee",
            1_000_000,
        )
        .unwrap();

    assert_eq!(gov.state(id, 1_000_000).unwrap(), ProposalState::Active);
    assert_eq!(gov.state(id, 1_000_050).unwrap(), ProposalState::Active);
    assert_eq!(gov.state(id, 1_000_099).unwrap(), ProposalState::Active);
    assert_ne!(gov.state(id, 1_000_100).unwrap(), ProposalState::Active);
    assert_eq!(gov.active_proposal_count(1_000_050), 1);
    assert_eq!(gov.active_proposal_count(1_000_100), 0);

    let err = gov.vote(id, proposer, true, 1, 1_000_100).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProposalNotActive);
}

// =========================================================================
// Capacity
// =========================================================================

#[test]
fn depth_d_tree_accepts_exactly_2_pow_d_leaves() {
    for depth in 1..=6usize {
        let mut tree = MerkleAccumulator::new(depth, 4).unwrap();
        let capacity = 1u64 << depth;
        for i in 0..capacity {
            let (index, _) = tree.insert(FieldElement::from_u64(i + 1)).unwrap();
            assert_eq!(index, i);
        }
        let root = tree.root();
        let err = tree.insert(FieldElement::from_u64(capacity + 1)).unwrap_err();
        assert!(matches!(err, CryptoError::TreeFull { capacity: c } if c == capacity));
        assert_eq!(tree.root(), root);
        assert_eq!(tree.leaf_count(), capacity);
    }
}

#[test]
fn full_pool_rejects_deposit_with_tree_full() {
    let (pool, pk) = pool(PoolConfig {
        tree_depth: 2,
        ..PoolConfig::default()
    });
    for block in 0..4 {
        deposit(&pool, &pk, &note(Amount(10)), block);
    }
    let (proof, inputs) = deposit_inputs(&pk, &note(Amount(10)));
    let ctx = TxContext::new(DEPOSITOR, 5).with_value(Amount(10));
    let err = pool.deposit_with_proof(&proof, &inputs, &ctx).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TreeFull);
    assert_eq!(pool.get_pool_utilization(), 100.0);
    assert_eq!(pool.total_value_locked(), Amount(40));
}
