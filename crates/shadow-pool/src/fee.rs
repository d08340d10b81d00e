//! # Fee Policy
//!
//! `fee = floor(amount × percentage_fee_bps / 10 000) + fixed_fee`, in
//! base units, with every step checked.

use shadow_core::{Amount, ErrorKind, FeeParameters, BPS_DENOMINATOR};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeeError {
    #[error("fee computation overflowed for amount {amount} at {percentage_fee_bps} bps")]
    FeeOverflow {
        amount: Amount,
        percentage_fee_bps: u32,
    },
}

impl FeeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FeeOverflow { .. } => ErrorKind::FeeOverflow,
        }
    }
}

/// Total fee for withdrawing `amount` under `params`.
///
/// A zero amount yields the fixed fee.
///
/// # Errors
///
/// `FeeOverflow` if the product or the sum exceeds `u128`.
pub fn compute_fee(amount: Amount, params: &FeeParameters) -> Result<Amount, FeeError> {
    let overflow = || FeeError::FeeOverflow {
        amount,
        percentage_fee_bps: params.percentage_fee_bps,
    };
    let percentage = amount
        .0
        .checked_mul(u128::from(params.percentage_fee_bps))
        .ok_or_else(overflow)?
        / u128::from(BPS_DENOMINATOR);
    percentage
        .checked_add(params.fixed_fee.0)
        .map(Amount)
        .ok_or_else(overflow)
}
