//! # Protocol Parameters
//!
//! Fee and governance parameters, the changes a governance proposal may
//! encode, and the versioned [`ParameterRegistry`] that the pool prices
//! withdrawals against.
//!
//! ## Versioning
//!
//! A fee change executed at block `X` becomes effective at block `X + 1`.
//! Earlier versions are kept, so [`ParameterRegistry::at`] answers "which fee
//! applied to a transaction submitted at block `b`" for any `b`, and a change
//! landing between submission and confirmation never reprices a withdrawal.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::amount::Amount;
use crate::error::ErrorKind;
use crate::identity::BlockNumber;

/// Denominator of a basis-point ratio.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Error validating or applying a parameter change.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParameterError {
    /// Percentage fee above 100%.
    #[error("percentage fee {bps} bps exceeds {BPS_DENOMINATOR} bps")]
    FeeBpsOutOfRange {
        /// The rejected value.
        bps: u128,
    },

    /// A voting period of zero blocks.
    #[error("voting period must be at least one block")]
    ZeroVotingPeriod,

    /// A proposal must allow at least one action.
    #[error("max operations must be at least 1")]
    ZeroMaxOperations,

    /// A new version would take effect before the latest one.
    #[error("fee version effective at block {effective_from} precedes latest version at block {latest}")]
    NonMonotonicSchedule {
        /// Requested effective block.
        effective_from: BlockNumber,
        /// Effective block of the latest version.
        latest: BlockNumber,
    },

    /// Block arithmetic overflowed.
    #[error("block number overflow scheduling change at block {0}")]
    BlockOverflow(BlockNumber),

    /// A deserialized version history is empty or out of order.
    #[error("malformed fee history: {0}")]
    MalformedHistory(String),
}

impl ParameterError {
    /// The taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

// ---------------------------------------------------------------------------
// Fee parameters
// ---------------------------------------------------------------------------

/// Pool fee schedule: a percentage in basis points plus a fixed amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeeParameters {
    /// Percentage fee in basis points (1 bps = 0.01%).
    pub percentage_fee_bps: u32,
    /// Fixed fee added to every withdrawal.
    pub fixed_fee: Amount,
}

impl FeeParameters {
    /// Build a fee schedule.
    pub fn new(percentage_fee_bps: u32, fixed_fee: Amount) -> Self {
        Self {
            percentage_fee_bps,
            fixed_fee,
        }
    }

    /// Reject a percentage above 100%.
    pub fn validate(&self) -> Result<(), ParameterError> {
        check_bps(u128::from(self.percentage_fee_bps)).map(|_| ())
    }
}

fn check_bps(bps: u128) -> Result<u32, ParameterError> {
    if bps > u128::from(BPS_DENOMINATOR) {
        return Err(ParameterError::FeeBpsOutOfRange { bps });
    }
    // Bounded by BPS_DENOMINATOR above.
    Ok(bps as u32)
}

// ---------------------------------------------------------------------------
// Governance parameters
// ---------------------------------------------------------------------------

/// Parameters of the governance engine itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceParameters {
    /// Minimum voting weight required to propose.
    pub proposal_threshold: u128,
    /// Minimum `for + against` weight for a proposal to succeed.
    pub quorum_votes: u128,
    /// Blocks between proposal creation and the start of voting.
    pub voting_delay: u64,
    /// Length of the voting window in blocks.
    pub voting_period: u64,
    /// Maximum number of actions in one proposal.
    pub max_operations: usize,
}

impl Default for GovernanceParameters {
    fn default() -> Self {
        Self {
            proposal_threshold: 0,
            quorum_votes: 0,
            voting_delay: 0,
            voting_period: 17_280,
            max_operations: 10,
        }
    }
}

impl GovernanceParameters {
    /// Reject a zero voting period or zero operation limit.
    pub fn validate(&self) -> Result<(), ParameterError> {
        if self.voting_period == 0 {
            return Err(ParameterError::ZeroVotingPeriod);
        }
        if self.max_operations == 0 {
            return Err(ParameterError::ZeroMaxOperations);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Parameter changes
// ---------------------------------------------------------------------------

/// A single parameter update carried by a governance proposal.
///
/// Serialized externally tagged (`{"set_quorum_votes": {...}}`) so the
/// 128-bit fields are read straight from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterChange {
    /// Replace both fee components.
    SetFeeParameters {
        /// New percentage fee.
        percentage_fee_bps: u128,
        /// New fixed fee.
        fixed_fee: Amount,
    },
    /// Replace the percentage fee, keeping the fixed fee.
    SetPercentageFee {
        /// New percentage fee.
        percentage_fee_bps: u128,
    },
    /// Replace the fixed fee, keeping the percentage.
    SetFixedFee {
        /// New fixed fee.
        fixed_fee: Amount,
    },
    /// Replace the voting period.
    SetVotingPeriod {
        /// New period in blocks.
        voting_period: u64,
    },
    /// Replace the quorum.
    SetQuorumVotes {
        /// New quorum.
        quorum_votes: u128,
    },
    /// Replace the proposal threshold.
    SetProposalThreshold {
        /// New threshold.
        proposal_threshold: u128,
    },
}

impl ParameterChange {
    /// Whether this change targets the pool fee schedule.
    pub fn is_fee_change(&self) -> bool {
        matches!(
            self,
            Self::SetFeeParameters { .. } | Self::SetPercentageFee { .. } | Self::SetFixedFee { .. }
        )
    }

    /// Check the change in isolation, without applying it.
    pub fn validate(&self) -> Result<(), ParameterError> {
        match self {
            Self::SetFeeParameters {
                percentage_fee_bps, ..
            }
            | Self::SetPercentageFee { percentage_fee_bps } => {
                check_bps(*percentage_fee_bps).map(|_| ())
            }
            Self::SetVotingPeriod { voting_period: 0 } => Err(ParameterError::ZeroVotingPeriod),
            Self::SetFixedFee { .. }
            | Self::SetVotingPeriod { .. }
            | Self::SetQuorumVotes { .. }
            | Self::SetProposalThreshold { .. } => Ok(()),
        }
    }

    /// The fee schedule that results from applying this change to `base`.
    ///
    /// Returns `Ok(None)` for governance changes.
    pub fn apply_to_fees(&self, base: FeeParameters) -> Result<Option<FeeParameters>, ParameterError> {
        let next = match *self {
            Self::SetFeeParameters {
                percentage_fee_bps,
                fixed_fee,
            } => FeeParameters::new(check_bps(percentage_fee_bps)?, fixed_fee),
            Self::SetPercentageFee { percentage_fee_bps } => {
                FeeParameters::new(check_bps(percentage_fee_bps)?, base.fixed_fee)
            }
            Self::SetFixedFee { fixed_fee } => {
                FeeParameters::new(base.percentage_fee_bps, fixed_fee)
            }
            _ => return Ok(None),
        };
        Ok(Some(next))
    }
}

impl std::fmt::Display for ParameterChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SetFeeParameters {
                percentage_fee_bps,
                fixed_fee,
            } => write!(f, "setFeeParameters({percentage_fee_bps} bps, {fixed_fee})"),
            Self::SetPercentageFee { percentage_fee_bps } => {
                write!(f, "setPercentageFee({percentage_fee_bps} bps)")
            }
            Self::SetFixedFee { fixed_fee } => write!(f, "setFixedFee({fixed_fee})"),
            Self::SetVotingPeriod { voting_period } => {
                write!(f, "setVotingPeriod({voting_period})")
            }
            Self::SetQuorumVotes { quorum_votes } => write!(f, "setQuorumVotes({quorum_votes})"),
            Self::SetProposalThreshold { proposal_threshold } => {
                write!(f, "setProposalThreshold({proposal_threshold})")
            }
        }
    }
}

/// Destination for parameter changes produced by executed proposals.
///
/// Returns `Ok(true)` if the sink consumed the change and `Ok(false)` if the
/// change targets some other component.
pub trait ParameterSink {
    /// Check that `apply_change` would succeed, without applying anything.
    fn check_change(
        &self,
        change: &ParameterChange,
        _executed_at: BlockNumber,
    ) -> Result<(), ParameterError> {
        change.validate()
    }

    /// Apply `change`, which was executed at block `executed_at`.
    fn apply_change(
        &mut self,
        change: &ParameterChange,
        executed_at: BlockNumber,
    ) -> Result<bool, ParameterError>;
}

impl ParameterSink for GovernanceParameters {
    fn apply_change(
        &mut self,
        change: &ParameterChange,
        _executed_at: BlockNumber,
    ) -> Result<bool, ParameterError> {
        change.validate()?;
        match *change {
            ParameterChange::SetVotingPeriod { voting_period } => {
                self.voting_period = voting_period
            }
            ParameterChange::SetQuorumVotes { quorum_votes } => self.quorum_votes = quorum_votes,
            ParameterChange::SetProposalThreshold { proposal_threshold } => {
                self.proposal_threshold = proposal_threshold
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// One entry in the fee schedule history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeParameterVersion {
    /// Version number, starting at 1.
    pub version: u32,
    /// First block this version applies to.
    pub effective_from: BlockNumber,
    /// The fee schedule.
    pub params: FeeParameters,
}

/// Append-only history of fee schedules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "Vec<FeeParameterVersion>",
    into = "Vec<FeeParameterVersion>"
)]
pub struct ParameterRegistry {
    versions: Vec<FeeParameterVersion>,
}

impl ParameterRegistry {
    /// Start a registry whose version 1 applies from block 0.
    pub fn new(initial: FeeParameters) -> Result<Self, ParameterError> {
        initial.validate()?;
        Ok(Self {
            versions: vec![FeeParameterVersion {
                version: 1,
                effective_from: 0,
                params: initial,
            }],
        })
    }

    /// The version in force at `block`.
    pub fn version_at(&self, block: BlockNumber) -> &FeeParameterVersion {
        self.versions
            .iter()
            .rev()
            .find(|v| v.effective_from <= block)
            .unwrap_or(&self.versions[0])
    }

    /// The fee schedule in force at `block`.
    pub fn at(&self, block: BlockNumber) -> FeeParameters {
        self.version_at(block).params
    }

    /// The most recently scheduled version.
    pub fn current(&self) -> &FeeParameterVersion {
        // `new` seeds one version and nothing removes versions.
        &self.versions[self.versions.len() - 1]
    }

    /// Every version in scheduling order.
    pub fn history(&self) -> &[FeeParameterVersion] {
        &self.versions
    }

    /// Schedule `params` to take effect the block after `executed_at`.
    pub fn schedule(
        &mut self,
        params: FeeParameters,
        executed_at: BlockNumber,
    ) -> Result<FeeParameterVersion, ParameterError> {
        params.validate()?;
        let effective_from = executed_at
            .checked_add(1)
            .ok_or(ParameterError::BlockOverflow(executed_at))?;
        let latest = *self.current();
        if effective_from < latest.effective_from {
            return Err(ParameterError::NonMonotonicSchedule {
                effective_from,
                latest: latest.effective_from,
            });
        }
        let entry = FeeParameterVersion {
            version: latest.version + 1,
            effective_from,
            params,
        };
        self.versions.push(entry);
        tracing::info!(
            version = entry.version,
            effective_from,
            percentage_fee_bps = params.percentage_fee_bps,
            fixed_fee = %params.fixed_fee,
            "fee parameters scheduled"
        );
        Ok(entry)
    }
}

impl TryFrom<Vec<FeeParameterVersion>> for ParameterRegistry {
    type Error = ParameterError;

    fn try_from(versions: Vec<FeeParameterVersion>) -> Result<Self, Self::Error> {
        let first = versions
            .first()
            .ok_or_else(|| ParameterError::MalformedHistory("no versions".to_string()))?;
        if first.version != 1 || first.effective_from != 0 {
            return Err(ParameterError::MalformedHistory(
                "version 1 must apply from block 0".to_string(),
            ));
        }
        for pair in versions.windows(2) {
            if pair[1].version != pair[0].version + 1
                || pair[1].effective_from < pair[0].effective_from
            {
                return Err(ParameterError::MalformedHistory(format!(
                    "version {} does not follow version {}",
                    pair[1].version, pair[0].version
                )));
            }
        }
        for v in &versions {
            v.params.validate()?;
        }
        Ok(Self { versions })
    }
}

impl From<ParameterRegistry> for Vec<FeeParameterVersion> {
    fn from(registry: ParameterRegistry) -> Self {
        registry.versions
    }
}

impl ParameterSink for ParameterRegistry {
    fn check_change(
        &self,
        change: &ParameterChange,
        executed_at: BlockNumber,
    ) -> Result<(), ParameterError> {
        change.validate()?;
        if !change.is_fee_change() {
            return Ok(());
        }
        let effective_from = executed_at
            .checked_add(1)
            .ok_or(ParameterError::BlockOverflow(executed_at))?;
        let latest = self.current().effective_from;
        if effective_from < latest {
            return Err(ParameterError::NonMonotonicSchedule {
                effective_from,
                latest,
            });
        }
        Ok(())
    }

    fn apply_change(
        &mut self,
        change: &ParameterChange,
        executed_at: BlockNumber,
    ) -> Result<bool, ParameterError> {
        match change.apply_to_fees(self.current().params)? {
            Some(next) => {
                self.schedule(next, executed_at)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
