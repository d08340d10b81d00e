//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use shadow_core::{Address, Amount, BlockNumber, PoolConfig};
use shadow_crypto::{DepositNote, MerkleProof, RecipientBinding};
use shadow_pool::{compute_fee, DepositReceipt, PoolLedger, ShadowPool, TxContext};
use shadow_zkp::{
    CircuitInputs, DepositPublicInputs, MockProof, MockProofBackend, MockProvingKey,
    MockVerifyingKey, ProofBackend, PublicInputs, WithdrawPublicInputs,
};

pub const DEPOSITOR: Address = Address::new([0xd0; 20]);
pub const RECIPIENT: Address = Address::new([0x7e; 20]);
pub const RELAYER: Address = Address::new([0xfe; 20]);

pub fn keys() -> (MockProvingKey, MockVerifyingKey) {
    MockProofBackend::setup(b"integration")
}

pub fn pool(config: PoolConfig) -> (ShadowPool<MockProofBackend>, MockProvingKey) {
    let (pk, vk) = keys();
    (ShadowPool::new(config, MockProofBackend::new(), vk).unwrap(), pk)
}

pub fn units(s: &str) -> Amount {
    Amount::parse_units(s).unwrap()
}

pub fn note(amount: Amount) -> DepositNote {
    DepositNote::generate(&mut rand_core::OsRng, amount, RecipientBinding::unbound())
}

/// Proof-backed deposit of `note` at `block`.
pub fn deposit<L: PoolLedger<Proof = MockProof>>(
    ledger: &L,
    pk: &MockProvingKey,
    note: &DepositNote,
    block: BlockNumber,
) -> DepositReceipt {
    let (proof, inputs) = deposit_inputs(pk, note);
    let ctx = TxContext::new(DEPOSITOR, block).with_value(note.amount());
    ledger.deposit_with_proof(&proof, &inputs, &ctx).unwrap()
}

pub fn deposit_inputs(pk: &MockProvingKey, note: &DepositNote) -> (MockProof, DepositPublicInputs) {
    let (proof, public) = MockProofBackend::new()
        .generate_proof(
            pk,
            &CircuitInputs::Deposit {
                note: note.clone(),
                root_after: None,
            },
        )
        .unwrap();
    let PublicInputs::Deposit(inputs) = public else {
        panic!("deposit circuit returned withdrawal inputs");
    };
    (proof, inputs)
}

/// Withdrawal proof for `note` along `path`, with an explicit fee.
pub fn prove_withdrawal(
    pk: &MockProvingKey,
    note: &DepositNote,
    path: MerkleProof,
    recipient: Address,
    fee: Amount,
) -> (MockProof, WithdrawPublicInputs) {
    let (proof, public) = MockProofBackend::new()
        .generate_proof(
            pk,
            &CircuitInputs::Withdraw {
                note: note.clone(),
                path,
                recipient,
                fee,
            },
        )
        .unwrap();
    let PublicInputs::Withdraw(inputs) = public else {
        panic!("withdrawal circuit returned deposit inputs");
    };
    (proof, inputs)
}

/// Withdrawal proof against the current root, priced at `submitted_at`.
pub fn prove_current<L: PoolLedger<Proof = MockProof>>(
    ledger: &L,
    pk: &MockProvingKey,
    note: &DepositNote,
    leaf_index: u64,
    submitted_at: BlockNumber,
) -> (MockProof, WithdrawPublicInputs) {
    let path = ledger.merkle_path(leaf_index).unwrap();
    let fee = compute_fee(note.amount(), &ledger.fee_parameters_at(submitted_at)).unwrap();
    prove_withdrawal(pk, note, path, RECIPIENT, fee)
}
