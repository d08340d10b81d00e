//! Protocol configuration.
//!
//! Pool and governance settings with defaults suitable for a fresh
//! deployment. Load from JSON or from `SHADOW_*` environment variables, then
//! call [`ProtocolConfig::validate`] before building a pool.

use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::identity::Address;
use crate::params::{FeeParameters, GovernanceParameters, ParameterError};

/// Largest supported tree depth.
pub const MAX_TREE_DEPTH: usize = 32;

/// Default bound on `included_at - submitted_at`, in blocks.
pub const DEFAULT_MAX_SUBMISSION_LAG: u64 = 256;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: \"{value}\" ({reason})")]
    InvalidEnv {
        var: String,
        value: String,
        reason: String,
    },
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("invalid parameters: {0}")]
    Parameters(#[from] ParameterError),
    #[error("malformed configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Pool settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Merkle tree depth `D`; capacity is `2^D` deposits.
    pub tree_depth: usize,
    /// Number of recent roots `K` a withdrawal may reference.
    pub root_history_size: usize,
    /// Fee schedule in force from block 0.
    pub initial_fee: FeeParameters,
    /// Accept value-only deposits that carry no well-formedness proof.
    pub allow_legacy_deposits: bool,
    /// Account credited with withdrawal fees.
    pub fee_recipient: Address,
    /// Most blocks a transaction may spend between submission and
    /// inclusion. Bounds how old a fee schedule a withdrawal can claim.
    pub max_submission_lag: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            tree_depth: 20,
            root_history_size: 30,
            initial_fee: FeeParameters::default(),
            allow_legacy_deposits: false,
            fee_recipient: Address::ZERO,
            max_submission_lag: DEFAULT_MAX_SUBMISSION_LAG,
        }
    }
}

impl PoolConfig {
    /// Check depth, history size and the initial fee.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tree_depth == 0 || self.tree_depth > MAX_TREE_DEPTH {
            return Err(ConfigError::Invalid {
                field: "tree_depth",
                reason: format!("must be in 1..={MAX_TREE_DEPTH}, got {}", self.tree_depth),
            });
        }
        if self.root_history_size == 0 {
            return Err(ConfigError::Invalid {
                field: "root_history_size",
                reason: "must be at least 1".to_string(),
            });
        }
        self.initial_fee.validate()?;
        Ok(())
    }
}

/// Governance settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    pub proposal_threshold: u128,
    pub quorum_votes: u128,
    pub voting_delay: u64,
    pub voting_period: u64,
    pub max_operations: usize,
    /// Account allowed to cancel any unexecuted proposal.
    pub guardian: Address,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        let p = GovernanceParameters::default();
        Self {
            proposal_threshold: p.proposal_threshold,
            quorum_votes: p.quorum_votes,
            voting_delay: p.voting_delay,
            voting_period: p.voting_period,
            max_operations: p.max_operations,
            guardian: Address::ZERO,
        }
    }
}

impl GovernanceConfig {
    /// The engine parameters this configuration describes.
    pub fn parameters(&self) -> GovernanceParameters {
        GovernanceParameters {
            proposal_threshold: self.proposal_threshold,
            quorum_votes: self.quorum_votes,
            voting_delay: self.voting_delay,
            voting_period: self.voting_period,
            max_operations: self.max_operations,
        }
    }
}

/// Complete protocol configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    pub pool: PoolConfig,
    pub governance: GovernanceConfig,
}

impl ProtocolConfig {
    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `SHADOW_TREE_DEPTH` (default: 20)
    /// - `SHADOW_ROOT_HISTORY_SIZE` (default: 30)
    /// - `SHADOW_FEE_BPS` (default: 0)
    /// - `SHADOW_FIXED_FEE` in base units (default: 0)
    /// - `SHADOW_ALLOW_LEGACY_DEPOSITS` (default: false)
    /// - `SHADOW_FEE_RECIPIENT` (default: zero address)
    /// - `SHADOW_MAX_SUBMISSION_LAG` in blocks (default: 256)
    /// - `SHADOW_PROPOSAL_THRESHOLD` (default: 0)
    /// - `SHADOW_QUORUM_VOTES` (default: 0)
    /// - `SHADOW_VOTING_DELAY` (default: 0)
    /// - `SHADOW_VOTING_PERIOD` (default: 17280)
    /// - `SHADOW_GUARDIAN` (default: zero address)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            pool: PoolConfig {
                tree_depth: env_parse(&lookup, "SHADOW_TREE_DEPTH", defaults.pool.tree_depth)?,
                root_history_size: env_parse(
                    &lookup,
                    "SHADOW_ROOT_HISTORY_SIZE",
                    defaults.pool.root_history_size,
                )?,
                initial_fee: FeeParameters {
                    percentage_fee_bps: env_parse(
                        &lookup,
                        "SHADOW_FEE_BPS",
                        defaults.pool.initial_fee.percentage_fee_bps,
                    )?,
                    fixed_fee: Amount(env_parse(
                        &lookup,
                        "SHADOW_FIXED_FEE",
                        defaults.pool.initial_fee.fixed_fee.0,
                    )?),
                },
                allow_legacy_deposits: env_parse(
                    &lookup,
                    "SHADOW_ALLOW_LEGACY_DEPOSITS",
                    defaults.pool.allow_legacy_deposits,
                )?,
                fee_recipient: env_parse(
                    &lookup,
                    "SHADOW_FEE_RECIPIENT",
                    defaults.pool.fee_recipient,
                )?,
                max_submission_lag: env_parse(
                    &lookup,
                    "SHADOW_MAX_SUBMISSION_LAG",
                    defaults.pool.max_submission_lag,
                )?,
            },
            governance: GovernanceConfig {
                proposal_threshold: env_parse(
                    &lookup,
                    "SHADOW_PROPOSAL_THRESHOLD",
                    defaults.governance.proposal_threshold,
                )?,
                quorum_votes: env_parse(
                    &lookup,
                    "SHADOW_QUORUM_VOTES",
                    defaults.governance.quorum_votes,
                )?,
                voting_delay: env_parse(
                    &lookup,
                    "SHADOW_VOTING_DELAY",
                    defaults.governance.voting_delay,
                )?,
                voting_period: env_parse(
                    &lookup,
                    "SHADOW_VOTING_PERIOD",
                    defaults.governance.voting_period,
                )?,
                max_operations: defaults.governance.max_operations,
                guardian: env_parse(&lookup, "SHADOW_GUARDIAN", defaults.governance.guardian)?,
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate pool and governance settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pool.validate()?;
        self.governance.parameters().validate()?;
        Ok(())
    }
}

fn env_parse<F, T>(lookup: &F, var: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidEnv {
            var: var.to_string(),
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}
