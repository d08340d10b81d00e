//! Pool statistics.

use serde::{Deserialize, Serialize};
use shadow_core::{Amount, FieldElement};
use shadow_zkp::ProofBackend;

use crate::ledger::ShadowPool;

/// Snapshot of pool counters and the latest fee schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Commitments in the tree.
    pub total_deposits: u64,
    /// Nullifiers spent.
    pub total_withdrawals: u64,
    pub total_value_locked: Amount,
    pub current_root: FieldElement,
    /// Percentage fee of the most recently scheduled version.
    pub current_percentage_fee: u32,
    pub current_fixed_fee: Amount,
    pub fee_version: u32,
}

/// Coarse size class of the anonymity set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AnonymityLevel {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl AnonymityLevel {
    /// Classify an anonymity set of `deposits` commitments.
    pub fn for_deposits(deposits: u64) -> Self {
        match deposits {
            0..=9 => Self::Low,
            10..=99 => Self::Medium,
            100..=999 => Self::High,
            _ => Self::VeryHigh,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::VeryHigh => "Very High",
        }
    }
}

impl std::fmt::Display for AnonymityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<B: ProofBackend> ShadowPool<B> {
    pub fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        let fees = *self.registry.read().current();
        PoolStats {
            total_deposits: state.tree.leaf_count(),
            total_withdrawals: state.nullifiers.len() as u64,
            total_value_locked: state.total_value_locked,
            current_root: state.tree.root(),
            current_percentage_fee: fees.params.percentage_fee_bps,
            current_fixed_fee: fees.params.fixed_fee,
            fee_version: fees.version,
        }
    }

    /// Filled leaves as a percentage of `2^D`.
    pub fn utilization(&self) -> f64 {
        let state = self.state.lock();
        state.tree.leaf_count() as f64 / state.tree.capacity() as f64 * 100.0
    }
}
