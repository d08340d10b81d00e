//! # Pool Snapshots
//!
//! A [`PoolSnapshot`] is the persisted form of a pool: the leaves in
//! insertion order, the retained root window, spent nullifiers, balances,
//! the fee registry and the event log. Restoring rebuilds the accumulator
//! from the leaves and refuses a snapshot whose roots do not recompute.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use shadow_core::{Address, Amount, BlockNumber, FieldElement, ParameterRegistry, PoolConfig};
use shadow_crypto::{MerkleAccumulator, RootHistory};
use shadow_zkp::ProofBackend;

use crate::error::PoolError;
use crate::ledger::{PoolEvent, PoolState, ShadowPool};
use crate::nullifier::SpentNullifiers;

/// Serializable pool state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub tree_depth: usize,
    /// Current root at snapshot time.
    pub root: FieldElement,
    pub leaves: Vec<FieldElement>,
    pub root_history: RootHistory,
    pub spent_nullifiers: SpentNullifiers,
    pub balances: BTreeMap<Address, Amount>,
    pub total_value_locked: Amount,
    pub registry: ParameterRegistry,
    pub events: Vec<PoolEvent>,
    /// Inclusion block of the last applied transition.
    #[serde(default)]
    pub last_block: BlockNumber,
}

impl PoolSnapshot {
    /// Write as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), PoolError> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        tracing::info!(path = %path.display(), leaves = self.leaves.len(), "pool snapshot saved");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, PoolError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

impl<B: ProofBackend> ShadowPool<B> {
    /// Capture the current state.
    pub fn snapshot(&self) -> PoolSnapshot {
        let state = self.state.lock();
        let registry = self.registry.read().clone();
        PoolSnapshot {
            tree_depth: state.tree.depth(),
            root: state.tree.root(),
            leaves: state.tree.leaves().to_vec(),
            root_history: state.tree.history().clone(),
            spent_nullifiers: state.nullifiers.clone(),
            balances: state.balances.clone(),
            total_value_locked: state.total_value_locked,
            registry,
            events: state.events.clone(),
            last_block: state.last_block,
        }
    }

    /// Rebuild a pool from `snapshot`.
    ///
    /// # Errors
    ///
    /// `Integrity` if the snapshot does not match `config`'s tree shape, if
    /// any retained root does not recompute from the leaves, or if the
    /// leaves contain a zero or repeated commitment.
    pub fn restore(
        config: PoolConfig,
        backend: B,
        verifying_key: B::VerifyingKey,
        snapshot: PoolSnapshot,
    ) -> Result<Self, PoolError> {
        config.validate()?;
        if snapshot.tree_depth != config.tree_depth {
            return Err(PoolError::Integrity(format!(
                "snapshot depth {} differs from configured depth {}",
                snapshot.tree_depth, config.tree_depth
            )));
        }
        if snapshot.root_history.capacity() != config.root_history_size {
            return Err(PoolError::Integrity(format!(
                "snapshot keeps {} roots, configuration keeps {}",
                snapshot.root_history.capacity(),
                config.root_history_size
            )));
        }

        let leaf_total = snapshot.leaves.len();
        let commitments: BTreeSet<FieldElement> = snapshot.leaves.iter().copied().collect();
        if commitments.len() != leaf_total {
            return Err(PoolError::Integrity("repeated commitment".to_string()));
        }
        if commitments.contains(&FieldElement::zero()) {
            return Err(PoolError::Integrity("zero commitment".to_string()));
        }

        let tree = MerkleAccumulator::restore(
            snapshot.tree_depth,
            snapshot.leaves,
            snapshot.root_history,
        )
        .map_err(|e| PoolError::Integrity(e.to_string()))?;
        if tree.root() != snapshot.root {
            return Err(PoolError::Integrity(format!(
                "rebuilt root {} differs from recorded root {}",
                tree.root(),
                snapshot.root
            )));
        }

        tracing::info!(
            leaves = leaf_total,
            spent = snapshot.spent_nullifiers.len(),
            root = %snapshot.root,
            "pool restored from snapshot"
        );
        Ok(Self::from_parts(
            config,
            backend,
            verifying_key,
            snapshot.registry,
            PoolState {
                tree,
                commitments,
                nullifiers: snapshot.spent_nullifiers,
                balances: snapshot.balances,
                total_value_locked: snapshot.total_value_locked,
                events: snapshot.events,
                last_block: snapshot.last_block,
            },
        ))
    }
}
