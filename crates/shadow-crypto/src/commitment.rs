//! # Commitment Scheme
//!
//! A deposit is represented on chain only by its commitment
//!
//! ```text
//! commitment     = Poseidon(secret, nullifier_seed, amount, recipient_binding)
//! nullifier_hash = Poseidon(nullifier_seed, secret)
//! ```
//!
//! The nullifier hash is revealed at withdrawal time. Different widths and
//! a swapped argument order keep it unlinkable to the commitment without
//! the secret.
//!
//! ## Secret Handling
//!
//! [`Secret`] and [`NullifierSeed`] hold raw bytes that are zeroized on
//! drop, compare in constant time, and print as `[REDACTED]`.

use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use shadow_core::{Address, Amount, FieldElement, FIELD_BYTES};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;
use crate::poseidon::poseidon_hash;

macro_rules! secret_field {
    ($name:ident, $label:literal) => {
        #[doc = concat!("A ", $label, " known only to the depositor.")]
        #[derive(Clone, Zeroize, ZeroizeOnDrop)]
        pub struct $name([u8; FIELD_BYTES]);

        impl $name {
            /// Sample uniformly from the scalar field.
            pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
                Self(FieldElement::random(rng).to_bytes())
            }

            /// Wrap an existing field element.
            pub fn from_field(value: FieldElement) -> Self {
                Self(value.to_bytes())
            }

            /// Decode canonical bytes.
            pub fn from_bytes(bytes: [u8; FIELD_BYTES]) -> Result<Self, CryptoError> {
                Ok(Self(FieldElement::from_bytes(bytes)?.to_bytes()))
            }

            /// The value as a field element.
            pub fn to_field(&self) -> FieldElement {
                // Constructors only admit canonical encodings.
                FieldElement::from_bytes(self.0).unwrap_or_default()
            }

            /// Borrow the raw encoding.
            pub fn expose_bytes(&self) -> &[u8; FIELD_BYTES] {
                &self.0
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.0.ct_eq(&other.0).into()
            }
        }

        impl Eq for $name {}

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(concat!(stringify!($name), "([REDACTED])"))
            }
        }
    };
}

secret_field!(Secret, "deposit secret");
secret_field!(NullifierSeed, "nullifier seed");

/// Restricts which recipient may withdraw a deposit.
///
/// Zero means unbound: any recipient may withdraw. Otherwise the value is
/// the recipient's address left-padded into a field element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipientBinding(FieldElement);

impl RecipientBinding {
    /// Any recipient may withdraw.
    pub const fn unbound() -> Self {
        Self(FieldElement::zero())
    }

    /// Only `recipient` may withdraw.
    pub fn bound_to(recipient: &Address) -> Self {
        Self(recipient.to_field())
    }

    /// Wrap a raw field value.
    pub fn from_field(value: FieldElement) -> Self {
        Self(value)
    }

    /// The value committed to.
    pub fn to_field(&self) -> FieldElement {
        self.0
    }

    /// Whether a specific recipient is required.
    pub fn is_bound(&self) -> bool {
        !self.0.is_zero()
    }

    /// Whether `recipient` may withdraw under this binding.
    pub fn permits(&self, recipient: &Address) -> bool {
        !self.is_bound() || self.0 == recipient.to_field()
    }
}

/// A deposit commitment, stored as a Merkle leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Commitment(pub FieldElement);

impl Commitment {
    /// The leaf value.
    pub fn to_field(&self) -> FieldElement {
        self.0
    }
}

impl std::fmt::Display for Commitment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// The spend tag revealed by a withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NullifierHash(pub FieldElement);

impl NullifierHash {
    /// The tag value.
    pub fn to_field(&self) -> FieldElement {
        self.0
    }
}

impl std::fmt::Display for NullifierHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// Derive the commitment for a deposit.
pub fn commit(
    secret: &Secret,
    seed: &NullifierSeed,
    amount: Amount,
    binding: &RecipientBinding,
) -> Result<Commitment, CryptoError> {
    let out = poseidon_hash(&[
        secret.to_field(),
        seed.to_field(),
        amount.to_field(),
        binding.to_field(),
    ])?;
    Ok(Commitment(out))
}

/// Derive a commitment from raw 32-byte encodings.
///
/// # Errors
///
/// `InvalidFieldEncoding` if any input is not below the field modulus.
pub fn commit_raw(
    secret: [u8; FIELD_BYTES],
    seed: [u8; FIELD_BYTES],
    amount: [u8; FIELD_BYTES],
    binding: [u8; FIELD_BYTES],
) -> Result<Commitment, CryptoError> {
    let out = poseidon_hash(&[
        FieldElement::from_bytes(secret)?,
        FieldElement::from_bytes(seed)?,
        FieldElement::from_bytes(amount)?,
        FieldElement::from_bytes(binding)?,
    ])?;
    Ok(Commitment(out))
}

/// Derive the nullifier hash revealed when the deposit is withdrawn.
pub fn nullifier_hash(secret: &Secret, seed: &NullifierSeed) -> Result<NullifierHash, CryptoError> {
    let out = poseidon_hash(&[seed.to_field(), secret.to_field()])?;
    Ok(NullifierHash(out))
}
