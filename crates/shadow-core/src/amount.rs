//! # Token Amounts
//!
//! Amounts are unsigned integers in base units with [`AMOUNT_DECIMALS`]
//! decimals, the same convention wallets use for native tokens. Decimal
//! strings such as `"1.0"` or `"0.001"` are parsed exactly; inputs with more
//! fractional digits than the precision are rejected rather than rounded.

use serde::{Deserialize, Serialize};

use crate::error::FieldError;
use crate::field::FieldElement;

/// Number of fractional decimal digits in one whole token.
pub const AMOUNT_DECIMALS: u32 = 18;

/// A token amount in base units.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(pub u128);

impl Amount {
    /// Zero base units.
    pub const ZERO: Amount = Amount(0);

    /// Wrap a base-unit count.
    pub const fn new(base_units: u128) -> Self {
        Self(base_units)
    }

    /// The base-unit count.
    pub const fn base_units(&self) -> u128 {
        self.0
    }

    /// Whether the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Parse a decimal string with [`AMOUNT_DECIMALS`] decimals.
    pub fn parse_units(s: &str) -> Result<Self, FieldError> {
        Self::parse_units_with(s, AMOUNT_DECIMALS)
    }

    /// Parse a decimal string with the given number of decimals.
    pub fn parse_units_with(s: &str, decimals: u32) -> Result<Self, FieldError> {
        let invalid = |reason: &str| FieldError::InvalidAmount {
            value: s.to_string(),
            reason: reason.to_string(),
        };
        let s = s.trim();
        if s.is_empty() {
            return Err(invalid("empty string"));
        }
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid("no digits"));
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid("only digits and a single '.' are allowed"));
        }
        if frac.len() > decimals as usize {
            return Err(invalid("more fractional digits than the token precision"));
        }
        let scale = 10u128
            .checked_pow(decimals)
            .ok_or_else(|| invalid("precision too large"))?;
        let whole_units = if whole.is_empty() {
            0
        } else {
            whole.parse::<u128>().map_err(|_| invalid("whole part out of range"))?
        };
        let frac_units = if frac.is_empty() {
            0
        } else {
            let padded = format!("{frac:0<width$}", width = decimals as usize);
            padded.parse::<u128>().map_err(|_| invalid("fraction out of range"))?
        };
        whole_units
            .checked_mul(scale)
            .and_then(|w| w.checked_add(frac_units))
            .map(Self)
            .ok_or_else(|| invalid("amount exceeds 128 bits"))
    }

    /// Render with [`AMOUNT_DECIMALS`] decimals, trimming trailing zeros.
    pub fn format_units(&self) -> String {
        let scale = 10u128.pow(AMOUNT_DECIMALS);
        let whole = self.0 / scale;
        let frac = self.0 % scale;
        if frac == 0 {
            return format!("{whole}.0");
        }
        let frac = format!("{frac:0>width$}", width = AMOUNT_DECIMALS as usize);
        format!("{whole}.{}", frac.trim_end_matches('0'))
    }

    /// Embed in the scalar field. Always canonical.
    pub fn to_field(&self) -> FieldElement {
        FieldElement::from_u128(self.0)
    }

    /// Checked addition.
    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Amount)
    }

    /// Checked subtraction.
    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_sub(rhs.0).map(Amount)
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(u128::from(value))
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_units())
    }
}
