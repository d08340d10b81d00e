//! # Field Codec
//!
//! Fixed-width encoding of BN254 scalar field elements. Commitments,
//! nullifier hashes, Merkle nodes and roots are all [`FieldElement`]s.
//!
//! ## Encoding
//!
//! 32 bytes, big-endian, strictly less than the scalar modulus
//! `r = 0x30644e72e131a029b85045b68181585d2833e84879b9709143e1f593f0000001`.
//! The textual form is `0x` followed by 64 lowercase hex digits.
//!
//! ## Security Invariant
//!
//! There is no constructor that accepts an out-of-range value. Decoding
//! rejects instead of reducing, so two distinct byte strings can never name
//! the same element.

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::FieldError;

/// Width of the canonical encoding in bytes.
pub const FIELD_BYTES: usize = 32;

/// A canonical element of the BN254 scalar field.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FieldElement([u8; FIELD_BYTES]);

impl FieldElement {
    /// The additive identity.
    pub const fn zero() -> Self {
        Self([0u8; FIELD_BYTES])
    }

    /// Decode a canonical big-endian encoding.
    ///
    /// # Errors
    ///
    /// `InvalidFieldEncoding` if the value is not below the field modulus.
    pub fn from_bytes(bytes: [u8; FIELD_BYTES]) -> Result<Self, FieldError> {
        let modulus = Fr::MODULUS.to_bytes_be();
        if bytes.as_slice() >= modulus.as_slice() {
            return Err(FieldError::encoding(format!(
                "0x{} is not below the field modulus",
                hex::encode(bytes)
            )));
        }
        Ok(Self(bytes))
    }

    /// Decode from a slice that must be exactly [`FIELD_BYTES`] long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, FieldError> {
        let arr: [u8; FIELD_BYTES] = bytes.try_into().map_err(|_| {
            FieldError::encoding(format!(
                "expected {FIELD_BYTES} bytes, got {}",
                bytes.len()
            ))
        })?;
        Self::from_bytes(arr)
    }

    /// Decode from hex, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, FieldError> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        if digits.len() != FIELD_BYTES * 2 {
            return Err(FieldError::encoding(format!(
                "expected {} hex digits, got {}",
                FIELD_BYTES * 2,
                digits.len()
            )));
        }
        let bytes =
            hex::decode(digits).map_err(|e| FieldError::encoding(format!("invalid hex: {e}")))?;
        Self::from_slice(&bytes)
    }

    /// Embed a `u64`. Always canonical.
    pub fn from_u64(value: u64) -> Self {
        Self::from_u128(u128::from(value))
    }

    /// Embed a `u128`. Always canonical (2^128 < r).
    pub fn from_u128(value: u128) -> Self {
        let mut out = [0u8; FIELD_BYTES];
        out[FIELD_BYTES - 16..].copy_from_slice(&value.to_be_bytes());
        Self(out)
    }

    /// Sample a uniformly distributed element.
    ///
    /// Draws 64 bytes and reduces, which keeps the bias below 2^-250.
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut wide = [0u8; 64];
        rng.fill_bytes(&mut wide);
        Self::from_fr(Fr::from_be_bytes_mod_order(&wide))
    }

    /// Convert to the arkworks representation.
    pub fn to_fr(&self) -> Fr {
        Fr::from_be_bytes_mod_order(&self.0)
    }

    /// Convert from the arkworks representation.
    pub fn from_fr(value: Fr) -> Self {
        let bytes = value.into_bigint().to_bytes_be();
        let mut out = [0u8; FIELD_BYTES];
        // Four 64-bit limbs: 32 bytes.
        let start = FIELD_BYTES.saturating_sub(bytes.len());
        out[start..].copy_from_slice(&bytes[bytes.len().saturating_sub(FIELD_BYTES)..]);
        Self(out)
    }

    /// The canonical encoding.
    pub fn to_bytes(&self) -> [u8; FIELD_BYTES] {
        self.0
    }

    /// Borrow the canonical encoding.
    pub fn as_bytes(&self) -> &[u8; FIELD_BYTES] {
        &self.0
    }

    /// `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Whether this is the zero element.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl From<u64> for FieldElement {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl TryFrom<[u8; FIELD_BYTES]> for FieldElement {
    type Error = FieldError;

    fn try_from(bytes: [u8; FIELD_BYTES]) -> Result<Self, Self::Error> {
        Self::from_bytes(bytes)
    }
}

impl std::str::FromStr for FieldElement {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl std::fmt::Display for FieldElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::fmt::Debug for FieldElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FieldElement({})", self.to_hex())
    }
}

impl Serialize for FieldElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for FieldElement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
