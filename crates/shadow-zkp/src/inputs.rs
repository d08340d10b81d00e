//! # Statement Inputs
//!
//! Public inputs are what the verifier sees; circuit inputs add the private
//! witness the prover needs.
//!
//! ## Withdrawal
//!
//! Public: `[root, nullifier, recipient, fee, amount]`, in exactly this
//! order. Private: the deposit note and its Merkle path. The statement is
//! that the note's commitment is a leaf under `root`, that `nullifier` is
//! the note's nullifier hash, that `amount` is the note's amount, that the
//! note's recipient binding admits `recipient`, and that `fee ≤ amount`.
//!
//! ## Deposit
//!
//! Public: `[commitment, amount]` plus the post-insertion root when the
//! depositor pins it. Private: the note. The statement is that the
//! commitment is well formed for the stated amount.

use serde::{Deserialize, Serialize};
use shadow_core::{Address, Amount, FieldElement};
use shadow_crypto::{Commitment, DepositNote, MerkleProof, NullifierHash};

/// Number of withdrawal public inputs.
pub const WITHDRAW_PUBLIC_INPUT_COUNT: usize = 5;

/// Which statement a proof is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitKind {
    Deposit,
    Withdraw,
}

impl CircuitKind {
    /// Domain tag mixed into proof digests.
    pub fn tag(&self) -> &'static [u8] {
        match self {
            Self::Deposit => b"deposit",
            Self::Withdraw => b"withdraw",
        }
    }
}

/// Public inputs of a withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawPublicInputs {
    pub root: FieldElement,
    pub nullifier_hash: NullifierHash,
    pub recipient: Address,
    pub fee: Amount,
    pub amount: Amount,
}

impl WithdrawPublicInputs {
    /// Field encoding in circuit order.
    pub fn to_field_elements(&self) -> [FieldElement; WITHDRAW_PUBLIC_INPUT_COUNT] {
        [
            self.root,
            self.nullifier_hash.to_field(),
            self.recipient.to_field(),
            self.fee.to_field(),
            self.amount.to_field(),
        ]
    }
}

/// Public inputs of a deposit well-formedness proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositPublicInputs {
    pub commitment: Commitment,
    pub amount: Amount,
    /// Root the depositor expects after insertion, if pinned.
    pub root_after: Option<FieldElement>,
}

impl DepositPublicInputs {
    /// Field encoding in circuit order. The root is omitted when unpinned.
    pub fn to_field_elements(&self) -> Vec<FieldElement> {
        let mut out = vec![self.commitment.to_field(), self.amount.to_field()];
        if let Some(root) = self.root_after {
            out.push(root);
        }
        out
    }
}

/// Public inputs of either statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicInputs {
    Deposit(DepositPublicInputs),
    Withdraw(WithdrawPublicInputs),
}

impl PublicInputs {
    pub fn circuit(&self) -> CircuitKind {
        match self {
            Self::Deposit(_) => CircuitKind::Deposit,
            Self::Withdraw(_) => CircuitKind::Withdraw,
        }
    }

    pub fn to_field_elements(&self) -> Vec<FieldElement> {
        match self {
            Self::Deposit(d) => d.to_field_elements(),
            Self::Withdraw(w) => w.to_field_elements().to_vec(),
        }
    }
}

impl From<DepositPublicInputs> for PublicInputs {
    fn from(inputs: DepositPublicInputs) -> Self {
        Self::Deposit(inputs)
    }
}

impl From<WithdrawPublicInputs> for PublicInputs {
    fn from(inputs: WithdrawPublicInputs) -> Self {
        Self::Withdraw(inputs)
    }
}

/// Everything a prover needs, public and private.
#[derive(Debug, Clone)]
pub enum CircuitInputs {
    /// Prove a commitment is well formed.
    Deposit {
        note: DepositNote,
        root_after: Option<FieldElement>,
    },
    /// Prove membership and knowledge of the note's secret.
    Withdraw {
        note: DepositNote,
        path: MerkleProof,
        recipient: Address,
        fee: Amount,
    },
}

impl CircuitInputs {
    pub fn circuit(&self) -> CircuitKind {
        match self {
            Self::Deposit { .. } => CircuitKind::Deposit,
            Self::Withdraw { .. } => CircuitKind::Withdraw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn withdraw_inputs_keep_fixed_order() {
        let inputs = WithdrawPublicInputs {
            root: FieldElement::from_u64(1),
            nullifier_hash: NullifierHash(FieldElement::from_u64(2)),
            recipient: Address::new([0; 20]),
            fee: Amount(4),
            amount: Amount(5),
        };
        let fields = inputs.to_field_elements();
        assert_eq!(fields[0], FieldElement::from_u64(1));
        assert_eq!(fields[1], FieldElement::from_u64(2));
        assert_eq!(fields[2], FieldElement::zero());
        assert_eq!(fields[3], FieldElement::from_u64(4));
        assert_eq!(fields[4], FieldElement::from_u64(5));
    }

    #[test]
    fn deposit_inputs_omit_unpinned_root() {
        let mut inputs = DepositPublicInputs {
            commitment: Commitment(FieldElement::from_u64(9)),
            amount: Amount(3),
            root_after: None,
        };
        assert_eq!(inputs.to_field_elements().len(), 2);
        inputs.root_after = Some(FieldElement::from_u64(7));
        assert_eq!(inputs.to_field_elements().len(), 3);
    }

    #[test]
    fn public_inputs_serialize_under_circuit_name() {
        let p = PublicInputs::Deposit(DepositPublicInputs {
            commitment: Commitment(FieldElement::from_u64(9)),
            amount: Amount(u128::MAX),
            root_after: None,
        });
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.starts_with("{\"deposit\":{"), "{json}");
        let back: PublicInputs = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
        assert_eq!(p.circuit(), CircuitKind::Deposit);
    }
}
