//! # Voting Weight
//!
//! Governance reads voting weight through the [`VotingPower`] capability so
//! any token or delegation scheme can back it. [`VotingLedger`] is the
//! in-process implementation: per-account checkpoints `(from_block, votes)`
//! answered by binary search.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shadow_core::{Address, BlockNumber};

use crate::error::GovernanceError;

/// Source of historical voting weight.
pub trait VotingPower {
    /// Votes `account` held at the end of `block`.
    fn votes_at(&self, account: &Address, block: BlockNumber) -> u128;
}

/// Weight held from `from_block` until the next checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub from_block: BlockNumber,
    pub votes: u128,
}

/// Checkpointed voting weights.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingLedger {
    checkpoints: BTreeMap<Address, Vec<Checkpoint>>,
}

impl VotingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `account`'s weight from `block` on.
    ///
    /// A second write in the same block replaces the first.
    pub fn set_votes(
        &mut self,
        account: Address,
        block: BlockNumber,
        votes: u128,
    ) -> Result<(), GovernanceError> {
        let history = self.checkpoints.entry(account).or_default();
        match history.last_mut() {
            Some(last) if last.from_block > block => {
                return Err(GovernanceError::CheckpointOutOfOrder {
                    account,
                    block,
                    latest: last.from_block,
                });
            }
            Some(last) if last.from_block == block => last.votes = votes,
            _ => history.push(Checkpoint {
                from_block: block,
                votes,
            }),
        }
        tracing::debug!(account = %account, block, votes, "voting weight checkpoint");
        Ok(())
    }

    /// The latest weight of `account`.
    pub fn current_votes(&self, account: &Address) -> u128 {
        self.checkpoints
            .get(account)
            .and_then(|h| h.last())
            .map_or(0, |c| c.votes)
    }

    /// All checkpoints of `account`, oldest first.
    pub fn checkpoints(&self, account: &Address) -> &[Checkpoint] {
        self.checkpoints
            .get(account)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl VotingPower for VotingLedger {
    fn votes_at(&self, account: &Address, block: BlockNumber) -> u128 {
        let history = self.checkpoints(account);
        let idx = history.partition_point(|c| c.from_block <= block);
        if idx == 0 {
            0
        } else {
            history[idx - 1].votes
        }
    }
}
