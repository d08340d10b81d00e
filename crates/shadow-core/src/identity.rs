//! # Identifiers
//!
//! Account addresses, proposal identifiers and block numbers.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::FieldError;
use crate::field::{FieldElement, FIELD_BYTES};

/// A block height. Block `b` is the `b`-th block of the host chain.
pub type BlockNumber = u64;

/// Width of an address in bytes.
pub const ADDRESS_BYTES: usize = 20;

/// A 20-byte account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_BYTES]);

impl Address {
    /// The all-zero address.
    pub const ZERO: Address = Address([0u8; ADDRESS_BYTES]);

    /// Wrap raw bytes.
    pub const fn new(bytes: [u8; ADDRESS_BYTES]) -> Self {
        Self(bytes)
    }

    /// Parse `0x` followed by 40 hex digits (prefix optional).
    pub fn from_hex(s: &str) -> Result<Self, FieldError> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        if digits.len() != ADDRESS_BYTES * 2 {
            return Err(FieldError::InvalidAddress(s.to_string()));
        }
        let bytes = hex::decode(digits).map_err(|_| FieldError::InvalidAddress(s.to_string()))?;
        let arr: [u8; ADDRESS_BYTES] = bytes
            .try_into()
            .map_err(|_| FieldError::InvalidAddress(s.to_string()))?;
        Ok(Self(arr))
    }

    /// The raw bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_BYTES] {
        &self.0
    }

    /// Whether this is the zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_BYTES]
    }

    /// Left-pad into a field element. 160 bits always fit.
    pub fn to_field(&self) -> FieldElement {
        let mut out = [0u8; FIELD_BYTES];
        out[FIELD_BYTES - ADDRESS_BYTES..].copy_from_slice(&self.0);
        FieldElement::from_bytes(out).unwrap_or_default()
    }

    /// Recover an address from a left-padded field element.
    ///
    /// Fails if any of the twelve high bytes are non-zero.
    pub fn from_field(fe: &FieldElement) -> Result<Self, FieldError> {
        let bytes = fe.as_bytes();
        let (pad, tail) = bytes.split_at(FIELD_BYTES - ADDRESS_BYTES);
        if pad.iter().any(|b| *b != 0) {
            return Err(FieldError::InvalidAddress(fe.to_hex()));
        }
        let mut arr = [0u8; ADDRESS_BYTES];
        arr.copy_from_slice(tail);
        Ok(Self(arr))
    }

    /// `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl From<[u8; ADDRESS_BYTES]> for Address {
    fn from(bytes: [u8; ADDRESS_BYTES]) -> Self {
        Self(bytes)
    }
}

impl std::str::FromStr for Address {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::fmt::Debug for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Sequential governance proposal identifier, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProposalId(pub u64);

impl std::fmt::Display for ProposalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prefixed_and_bare() {
        let a = Address::from_hex("0x00000000000000000000000000000000000000ab").unwrap();
        let b = Address::from_hex("00000000000000000000000000000000000000ab").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_bytes()[19], 0xab);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(matches!(
            Address::from_hex("0xabcd"),
            Err(FieldError::InvalidAddress(_))
        ));
    }

    #[test]
    fn rejects_non_hex() {
        assert!(Address::from_hex(&format!("0x{}", "zz".repeat(20))).is_err());
    }

    #[test]
    fn field_embedding_round_trips() {
        let addr = Address::new([0x11; 20]);
        let fe = addr.to_field();
        assert_eq!(&fe.as_bytes()[..12], &[0u8; 12]);
        assert_eq!(Address::from_field(&fe).unwrap(), addr);
    }

    #[test]
    fn from_field_rejects_wide_values() {
        let mut bytes = [0u8; 32];
        bytes[0] = 1;
        let fe = FieldElement::from_bytes(bytes).unwrap();
        assert!(Address::from_field(&fe).is_err());
    }

    #[test]
    fn serde_uses_hex() {
        let addr = Address::new([0xee; 20]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"0x{}\"", "ee".repeat(20)));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn proposal_id_display() {
        assert_eq!(ProposalId(7).to_string(), "#7");
    }
}
