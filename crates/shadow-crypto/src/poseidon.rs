//! # Poseidon Hashing
//!
//! Circom-compatible Poseidon over the BN254 scalar field, via
//! `light-poseidon`. Widths 1 through 12 are supported; the pool uses width
//! 4 for commitments and width 2 for nullifier hashes and tree nodes.
//!
//! A hasher instance is built per call. Parameter construction is cheap next
//! to the permutation and this keeps the functions free of shared state.

use ark_bn254::Fr;
use light_poseidon::{Poseidon, PoseidonHasher};
use shadow_core::FieldElement;

use crate::error::CryptoError;

/// Hash a sequence of field elements.
///
/// # Errors
///
/// `CryptoError::Poseidon` for an empty input or more than 12 inputs.
pub fn poseidon_hash(inputs: &[FieldElement]) -> Result<FieldElement, CryptoError> {
    let mut hasher = Poseidon::<Fr>::new_circom(inputs.len())?;
    let frs: Vec<Fr> = inputs.iter().map(FieldElement::to_fr).collect();
    let out = hasher.hash(&frs)?;
    Ok(FieldElement::from_fr(out))
}

/// Hash two children into their parent node.
pub fn hash_pair(left: &FieldElement, right: &FieldElement) -> Result<FieldElement, CryptoError> {
    poseidon_hash(&[*left, *right])
}
