//! # Mock Proof Backend
//!
//! A deterministic, transparent proof backend for development and testing.
//! Proof generation checks the witness against the statement exactly as a
//! circuit would, then emits
//!
//! ```text
//! proof = SHA-256("shadow-mock-proof" ‖ key_id ‖ circuit tag ‖ public inputs)
//! ```
//!
//! Verification recomputes the digest and compares in constant time, so a
//! proof is bound to its key and to every public input.
//!
//! ## Security Notice
//!
//! This backend provides NO zero-knowledge and NO soundness against anyone
//! who knows the key id. It exists so the pool can be exercised end to end.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::inputs::{CircuitInputs, CircuitKind, DepositPublicInputs, PublicInputs, WithdrawPublicInputs};
use crate::traits::{ProofBackend, ProofError, VerifyError};

const PROOF_DOMAIN: &[u8] = b"shadow-mock-proof";
const KEY_DOMAIN: &[u8] = b"shadow-mock-key";

/// A mock proof: a SHA-256 digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockProof(pub [u8; 32]);

impl Serialize for MockProof {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for MockProof {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("mock proof must be 32 bytes"))?;
        Ok(Self(arr))
    }
}

/// Mock proving key.
#[derive(Debug, Clone)]
pub struct MockProvingKey {
    key_id: [u8; 32],
}

/// Mock verifying key.
#[derive(Debug, Clone)]
pub struct MockVerifyingKey {
    key_id: [u8; 32],
}

/// Deterministic mock backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockProofBackend;

impl MockProofBackend {
    pub fn new() -> Self {
        Self
    }

    /// Derive a matching key pair from a setup seed.
    pub fn setup(seed: &[u8]) -> (MockProvingKey, MockVerifyingKey) {
        let key_id: [u8; 32] = Sha256::new()
            .chain_update(KEY_DOMAIN)
            .chain_update(seed)
            .finalize()
            .into();
        (MockProvingKey { key_id }, MockVerifyingKey { key_id })
    }

    fn digest(key_id: &[u8; 32], public_inputs: &PublicInputs) -> [u8; 32] {
        let mut hasher = Sha256::new()
            .chain_update(PROOF_DOMAIN)
            .chain_update(key_id)
            .chain_update(public_inputs.circuit().tag());
        if let PublicInputs::Deposit(d) = public_inputs {
            hasher.update([u8::from(d.root_after.is_some())]);
        }
        for fe in public_inputs.to_field_elements() {
            hasher.update(fe.as_bytes());
        }
        hasher.finalize().into()
    }

    fn check_withdraw(inputs: &CircuitInputs) -> Result<PublicInputs, ProofError> {
        let CircuitInputs::Withdraw {
            note,
            path,
            recipient,
            fee,
        } = inputs
        else {
            return Err(ProofError::WitnessError("expected withdrawal inputs".into()));
        };
        let commitment = note.commitment()?;
        if path.leaf != commitment.to_field() {
            return Err(ProofError::WitnessError(
                "Merkle path does not start at the note's commitment".into(),
            ));
        }
        if path.compute_root()? != path.root {
            return Err(ProofError::WitnessError(
                "Merkle path does not lead to its root".into(),
            ));
        }
        if !note.binding().permits(recipient) {
            return Err(ProofError::WitnessError(
                "note is bound to a different recipient".into(),
            ));
        }
        if *fee > note.amount() {
            return Err(ProofError::WitnessError("fee exceeds note amount".into()));
        }
        Ok(PublicInputs::Withdraw(WithdrawPublicInputs {
            root: path.root,
            nullifier_hash: note.nullifier_hash()?,
            recipient: *recipient,
            fee: *fee,
            amount: note.amount(),
        }))
    }

    fn check_deposit(inputs: &CircuitInputs) -> Result<PublicInputs, ProofError> {
        let CircuitInputs::Deposit { note, root_after } = inputs else {
            return Err(ProofError::WitnessError("expected deposit inputs".into()));
        };
        Ok(PublicInputs::Deposit(DepositPublicInputs {
            commitment: note.commitment()?,
            amount: note.amount(),
            root_after: *root_after,
        }))
    }
}

impl ProofBackend for MockProofBackend {
    type Proof = MockProof;
    type VerifyingKey = MockVerifyingKey;
    type ProvingKey = MockProvingKey;

    fn generate_proof(
        &self,
        pk: &Self::ProvingKey,
        inputs: &CircuitInputs,
    ) -> Result<(Self::Proof, PublicInputs), ProofError> {
        let public = match inputs.circuit() {
            CircuitKind::Deposit => Self::check_deposit(inputs)?,
            CircuitKind::Withdraw => Self::check_withdraw(inputs)?,
        };
        let proof = MockProof(Self::digest(&pk.key_id, &public));
        tracing::debug!(circuit = ?public.circuit(), "mock proof generated");
        Ok((proof, public))
    }

    fn verify(
        &self,
        vk: &Self::VerifyingKey,
        proof: &Self::Proof,
        public_inputs: &PublicInputs,
    ) -> Result<bool, VerifyError> {
        let expected = Self::digest(&vk.key_id, public_inputs);
        Ok(expected.ct_eq(&proof.0).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shadow_core::{Address, Amount, FieldElement};
    use shadow_crypto::{DepositNote, MerkleAccumulator, RecipientBinding};

    fn setup() -> (MockProofBackend, MockProvingKey, MockVerifyingKey) {
        let (pk, vk) = MockProofBackend::setup(b"test");
        (MockProofBackend::new(), pk, vk)
    }

    fn deposited(binding: RecipientBinding) -> (DepositNote, MerkleAccumulator) {
        let note = DepositNote::generate(&mut rand_core::OsRng, Amount(1_000), binding);
        let mut tree = MerkleAccumulator::new(4, 8).unwrap();
        tree.insert(FieldElement::from_u64(5)).unwrap();
        tree.insert(note.commitment().unwrap().to_field()).unwrap();
        (note, tree)
    }

    fn withdraw_inputs(note: &DepositNote, tree: &MerkleAccumulator, to: Address) -> CircuitInputs {
        CircuitInputs::Withdraw {
            note: note.clone(),
            path: tree.path_for(1).unwrap(),
            recipient: to,
            fee: Amount(10),
        }
    }

    #[test]
    fn valid_withdrawal_proves_and_verifies() {
        let (backend, pk, vk) = setup();
        let (note, tree) = deposited(RecipientBinding::unbound());
        let to = Address::new([3; 20]);
        let (proof, public) = backend
            .generate_proof(&pk, &withdraw_inputs(&note, &tree, to))
            .unwrap();
        let PublicInputs::Withdraw(w) = public else {
            panic!("expected withdrawal inputs");
        };
        assert_eq!(w.root, tree.root());
        assert_eq!(w.nullifier_hash, note.nullifier_hash().unwrap());
        assert_eq!(w.amount, Amount(1_000));
        assert!(backend.verify(&vk, &proof, &public).unwrap());
    }

    #[test]
    fn tampered_public_input_fails_verification() {
        let (backend, pk, vk) = setup();
        let (note, tree) = deposited(RecipientBinding::unbound());
        let (proof, public) = backend
            .generate_proof(&pk, &withdraw_inputs(&note, &tree, Address::new([3; 20])))
            .unwrap();
        let PublicInputs::Withdraw(mut w) = public else {
            panic!("expected withdrawal inputs");
        };
        w.recipient = Address::new([4; 20]);
        assert!(!backend.verify(&vk, &proof, &w.into()).unwrap());
    }

    #[test]
    fn wrong_key_fails_verification() {
        let (backend, pk, _) = setup();
        let (_, other_vk) = MockProofBackend::setup(b"other");
        let (note, tree) = deposited(RecipientBinding::unbound());
        let (proof, public) = backend
            .generate_proof(&pk, &withdraw_inputs(&note, &tree, Address::new([3; 20])))
            .unwrap();
        assert!(!backend.verify(&other_vk, &proof, &public).unwrap());
    }

    #[test]
    fn bound_note_rejects_other_recipient() {
        let (backend, pk, _) = setup();
        let alice = Address::new([0xa1; 20]);
        let (note, tree) = deposited(RecipientBinding::bound_to(&alice));
        assert!(backend
            .generate_proof(&pk, &withdraw_inputs(&note, &tree, alice))
            .is_ok());
        let err = backend
            .generate_proof(&pk, &withdraw_inputs(&note, &tree, Address::new([0xb0; 20])))
            .unwrap_err();
        assert!(matches!(err, ProofError::WitnessError(_)));
    }

    #[test]
    fn path_for_other_leaf_is_rejected() {
        let (backend, pk, _) = setup();
        let (note, tree) = deposited(RecipientBinding::unbound());
        let inputs = CircuitInputs::Withdraw {
            note,
            path: tree.path_for(0).unwrap(),
            recipient: Address::new([3; 20]),
            fee: Amount(0),
        };
        assert!(backend.generate_proof(&pk, &inputs).is_err());
    }

    #[test]
    fn fee_above_amount_is_rejected() {
        let (backend, pk, _) = setup();
        let (note, tree) = deposited(RecipientBinding::unbound());
        let inputs = CircuitInputs::Withdraw {
            note,
            path: tree.path_for(1).unwrap(),
            recipient: Address::new([3; 20]),
            fee: Amount(1_001),
        };
        assert!(backend.generate_proof(&pk, &inputs).is_err());
    }

    #[test]
    fn deposit_proof_binds_pinned_root() {
        let (backend, pk, vk) = setup();
        let note = DepositNote::generate(&mut rand_core::OsRng, Amount(5), RecipientBinding::unbound());
        let pinned = FieldElement::from_u64(77);
        let (proof, public) = backend
            .generate_proof(
                &pk,
                &CircuitInputs::Deposit {
                    note: note.clone(),
                    root_after: Some(pinned),
                },
            )
            .unwrap();
        assert!(backend.verify(&vk, &proof, &public).unwrap());
        let PublicInputs::Deposit(mut d) = public else {
            panic!("expected deposit inputs");
        };
        d.root_after = None;
        assert!(!backend.verify(&vk, &proof, &d.into()).unwrap());
    }

    #[test]
    fn proof_serializes_as_hex() {
        let json = serde_json::to_string(&MockProof([0xab; 32])).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(32)));
        let back: MockProof = serde_json::from_str(&json).unwrap();
        assert_eq!(back, MockProof([0xab; 32]));
    }
}
