//! Client configuration.
//!
//! Timeouts for the two suspension points (proof generation, submission)
//! and the resubmission policy.

use std::time::Duration;

use shadow_core::ConfigError;

use crate::retry::RetryPolicy;

/// Settings for [`WithdrawalClient`](crate::WithdrawalClient).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// Upper bound on one proof generation.
    pub proof_timeout: Duration,
    /// Upper bound on one submission.
    pub submit_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            proof_timeout: Duration::from_secs(120),
            submit_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `SHADOW_PROOF_TIMEOUT_SECS` (default: 120)
    /// - `SHADOW_SUBMIT_TIMEOUT_SECS` (default: 30)
    /// - `SHADOW_MAX_ATTEMPTS` (default: 3, at least 1)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through `lookup` instead of the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let proof_secs = parse(&lookup, "SHADOW_PROOF_TIMEOUT_SECS", defaults.proof_timeout.as_secs())?;
        let submit_secs = parse(&lookup, "SHADOW_SUBMIT_TIMEOUT_SECS", defaults.submit_timeout.as_secs())?;
        let max_attempts = parse(&lookup, "SHADOW_MAX_ATTEMPTS", defaults.retry.max_attempts)?;
        if max_attempts == 0 {
            return Err(ConfigError::InvalidEnv {
                var: "SHADOW_MAX_ATTEMPTS".to_string(),
                value: "0".to_string(),
                reason: "at least one attempt is required".to_string(),
            });
        }
        Ok(Self {
            proof_timeout: Duration::from_secs(proof_secs),
            submit_timeout: Duration::from_secs(submit_secs),
            retry: RetryPolicy {
                max_attempts,
                ..defaults.retry
            },
        })
    }
}

fn parse<F, T>(lookup: &F, var: &str, default: T) -> Result<T, ConfigError>
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
