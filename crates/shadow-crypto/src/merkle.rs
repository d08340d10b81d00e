//! # Merkle Accumulator
//!
//! A fixed-depth, append-only binary Merkle tree of commitments, hashed with
//! Poseidon. Empty positions hold the per-level "zero" value
//! `zeros[0] = 0`, `zeros[i + 1] = H(zeros[i], zeros[i])`, computed once at
//! construction.
//!
//! ## Structure
//!
//! Every populated node is stored, level by level, so an insert recomputes
//! only the `D` nodes on the new leaf's path and a membership path is a
//! series of lookups.
//!
//! ## Root History
//!
//! The accumulator keeps the last `K` roots together with the leaf count
//! each was computed over. Withdrawals may reference any retained root, and
//! [`MerkleAccumulator::path_at`] rebuilds the path a leaf had under that
//! root, so a proof built against a slightly stale root stays valid until
//! the root falls out of the window.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use shadow_core::FieldElement;

use crate::error::CryptoError;
use crate::poseidon::hash_pair;

/// Largest supported depth.
pub const MAX_DEPTH: usize = 32;

/// A root and the number of leaves it commits to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootEntry {
    pub root: FieldElement,
    pub leaf_count: u64,
}

/// Ring buffer of the most recent roots.
///
/// Deserialization enforces the same shape `push` maintains: at least one
/// slot, no more entries than slots, leaf counts strictly increasing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RootHistoryRecord")]
pub struct RootHistory {
    capacity: usize,
    entries: VecDeque<RootEntry>,
}

#[derive(Deserialize)]
struct RootHistoryRecord {
    capacity: usize,
    entries: VecDeque<RootEntry>,
}

impl TryFrom<RootHistoryRecord> for RootHistory {
    type Error = CryptoError;

    fn try_from(record: RootHistoryRecord) -> Result<Self, CryptoError> {
        if record.capacity == 0 {
            return Err(CryptoError::InvalidHistorySize);
        }
        if record.entries.len() > record.capacity {
            return Err(CryptoError::HistoryOverCapacity {
                len: record.entries.len(),
                capacity: record.capacity,
            });
        }
        let ordered = record
            .entries
            .iter()
            .zip(record.entries.iter().skip(1))
            .all(|(a, b)| a.leaf_count < b.leaf_count);
        if !ordered {
            return Err(CryptoError::HistoryOutOfOrder);
        }
        Ok(Self {
            capacity: record.capacity,
            entries: record.entries,
        })
    }
}

impl RootHistory {
    /// An empty history holding up to `capacity` roots.
    pub fn new(capacity: usize) -> Result<Self, CryptoError> {
        if capacity == 0 {
            return Err(CryptoError::InvalidHistorySize);
        }
        Ok(Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        })
    }

    /// Record a new root, evicting the oldest if full.
    pub fn push(&mut self, entry: RootEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Whether `root` is retained. The zero element is never known.
    pub fn contains(&self, root: &FieldElement) -> bool {
        !root.is_zero() && self.entries.iter().any(|e| e.root == *root)
    }

    /// The retained entry for `root`, newest first.
    pub fn get(&self, root: &FieldElement) -> Option<&RootEntry> {
        if root.is_zero() {
            return None;
        }
        self.entries.iter().rev().find(|e| e.root == *root)
    }

    /// The most recent entry.
    pub fn latest(&self) -> Option<&RootEntry> {
        self.entries.back()
    }

    /// Entries from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &RootEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// A membership path from a leaf to a root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// Position of the leaf.
    pub leaf_index: u64,
    /// The leaf value.
    pub leaf: FieldElement,
    /// Sibling at each level, leaf level first.
    pub siblings: Vec<FieldElement>,
    /// `true` where the path node is a right child.
    pub path_indices: Vec<bool>,
    /// The root this path was built for.
    pub root: FieldElement,
}

impl MerkleProof {
    /// Fold the path from the leaf up.
    pub fn compute_root(&self) -> Result<FieldElement, CryptoError> {
        let mut node = self.leaf;
        for (sibling, is_right) in self.siblings.iter().zip(&self.path_indices) {
            node = if *is_right {
                hash_pair(sibling, &node)?
            } else {
                hash_pair(&node, sibling)?
            };
        }
        Ok(node)
    }

    /// Whether the path leads to `root`.
    pub fn verify(&self, root: &FieldElement) -> bool {
        self.siblings.len() == self.path_indices.len()
            && matches!(self.compute_root(), Ok(r) if r == *root)
    }
}

/// Append-only Poseidon Merkle tree with bounded root history.
#[derive(Debug, Clone)]
pub struct MerkleAccumulator {
    depth: usize,
    zeros: Vec<FieldElement>,
    layers: Vec<Vec<FieldElement>>,
    history: RootHistory,
}

impl MerkleAccumulator {
    /// An empty tree of `depth` levels retaining `history_size` roots.
    pub fn new(depth: usize, history_size: usize) -> Result<Self, CryptoError> {
        if depth == 0 || depth > MAX_DEPTH {
            return Err(CryptoError::InvalidDepth(depth));
        }
        let zeros = compute_zeros(depth)?;
        let mut history = RootHistory::new(history_size)?;
        history.push(RootEntry {
            root: zeros[depth],
            leaf_count: 0,
        });
        Ok(Self {
            depth,
            zeros,
            layers: vec![Vec::new(); depth + 1],
            history,
        })
    }

    /// Rebuild from stored leaves and a stored root history.
    ///
    /// Every retained root is recomputed from the leaves; any disagreement
    /// is reported as `UnknownRoot`.
    pub fn restore(
        depth: usize,
        leaves: Vec<FieldElement>,
        history: RootHistory,
    ) -> Result<Self, CryptoError> {
        let mut acc = Self::new(depth, history.capacity())?;
        if leaves.len() as u64 > acc.capacity() {
            return Err(CryptoError::TreeFull {
                capacity: acc.capacity(),
            });
        }
        acc.layers[0] = leaves;
        for level in 0..depth {
            let below = &acc.layers[level];
            let mut above = Vec::with_capacity(below.len().div_ceil(2));
            for pair in below.chunks(2) {
                let right = pair.get(1).unwrap_or(&acc.zeros[level]);
                above.push(hash_pair(&pair[0], right)?);
            }
            acc.layers[level + 1] = above;
        }
        for entry in history.iter() {
            if entry.leaf_count > acc.leaf_count() {
                return Err(CryptoError::IndexOutOfRange {
                    index: entry.leaf_count,
                    leaf_count: acc.leaf_count(),
                });
            }
            if acc.root_for_count(entry.leaf_count)? != entry.root {
                return Err(CryptoError::UnknownRoot(entry.root.to_hex()));
            }
        }
        match history.latest() {
            Some(latest) if latest.leaf_count == acc.leaf_count() => {}
            _ => return Err(CryptoError::UnknownRoot(acc.root().to_hex())),
        }
        acc.history = history;
        Ok(acc)
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Maximum number of leaves, `2^depth`.
    pub fn capacity(&self) -> u64 {
        1u64 << self.depth
    }

    pub fn leaf_count(&self) -> u64 {
        self.layers[0].len() as u64
    }

    pub fn leaves(&self) -> &[FieldElement] {
        &self.layers[0]
    }

    /// The empty-subtree value at each level.
    pub fn zeros(&self) -> &[FieldElement] {
        &self.zeros
    }

    pub fn history(&self) -> &RootHistory {
        &self.history
    }

    /// The current root.
    pub fn root(&self) -> FieldElement {
        self.layers[self.depth]
            .first()
            .copied()
            .unwrap_or(self.zeros[self.depth])
    }

    /// Whether `root` is among the last `K` roots.
    pub fn is_known_root(&self, root: &FieldElement) -> bool {
        self.history.contains(root)
    }

    /// Append `leaf`, returning its index and the new root.
    ///
    /// # Errors
    ///
    /// `TreeFull` once `2^depth` leaves are present.
    pub fn insert(&mut self, leaf: FieldElement) -> Result<(u64, FieldElement), CryptoError> {
        let index = self.leaf_count();
        let path = self.insertion_path(leaf)?;
        let mut pos = index as usize;
        for (level, node) in path.into_iter().enumerate() {
            let layer = &mut self.layers[level];
            if pos == layer.len() {
                layer.push(node);
            } else {
                layer[pos] = node;
            }
            pos /= 2;
        }
        let root = self.root();
        self.history.push(RootEntry {
            root,
            leaf_count: index + 1,
        });
        tracing::debug!(leaf_index = index, root = %root, "leaf inserted");
        Ok((index, root))
    }

    /// The root `insert(leaf)` would produce, without inserting.
    pub fn preview_root(&self, leaf: FieldElement) -> Result<FieldElement, CryptoError> {
        let path = self.insertion_path(leaf)?;
        Ok(path.last().copied().unwrap_or(leaf))
    }

    /// Path from leaf `index` to the current root.
    ///
    /// # Errors
    ///
    /// `IndexOutOfRange` if `index` was never inserted.
    pub fn path_for(&self, index: u64) -> Result<MerkleProof, CryptoError> {
        self.build_path(index, self.leaf_count())
    }

    /// Path from leaf `index` to a retained historical `root`.
    ///
    /// # Errors
    ///
    /// `UnknownRoot` if `root` is not retained; `IndexOutOfRange` if the
    /// leaf was inserted after `root` was computed.
    pub fn path_at(&self, index: u64, root: &FieldElement) -> Result<MerkleProof, CryptoError> {
        let entry = self
            .history
            .get(root)
            .ok_or_else(|| CryptoError::UnknownRoot(root.to_hex()))?;
        self.build_path(index, entry.leaf_count)
    }

    /// New node values from the leaf (level 0) up to the root (level D).
    fn insertion_path(&self, leaf: FieldElement) -> Result<Vec<FieldElement>, CryptoError> {
        let index = self.leaf_count();
        if index >= self.capacity() {
            return Err(CryptoError::TreeFull {
                capacity: self.capacity(),
            });
        }
        let mut out = Vec::with_capacity(self.depth + 1);
        let mut node = leaf;
        let mut pos = index as usize;
        out.push(node);
        for level in 0..self.depth {
            node = if pos % 2 == 1 {
                hash_pair(&self.layers[level][pos - 1], &node)?
            } else {
                hash_pair(&node, &self.zeros[level])?
            };
            out.push(node);
            pos /= 2;
        }
        Ok(out)
    }

    fn build_path(&self, index: u64, leaf_count: u64) -> Result<MerkleProof, CryptoError> {
        if index >= leaf_count {
            return Err(CryptoError::IndexOutOfRange {
                index,
                leaf_count,
            });
        }
        let mut siblings = Vec::with_capacity(self.depth);
        let mut path_indices = Vec::with_capacity(self.depth);
        let mut pos = index;
        for level in 0..self.depth {
            siblings.push(self.node_at(level, pos ^ 1, leaf_count)?);
            path_indices.push(pos % 2 == 1);
            pos /= 2;
        }
        Ok(MerkleProof {
            leaf_index: index,
            leaf: self.layers[0][index as usize],
            siblings,
            path_indices,
            root: self.root_for_count(leaf_count)?,
        })
    }

    fn root_for_count(&self, leaf_count: u64) -> Result<FieldElement, CryptoError> {
        self.node_at(self.depth, 0, leaf_count)
    }

    /// Node `pos` at `level` in the tree truncated to its first `leaf_count` leaves.
    fn node_at(&self, level: usize, pos: u64, leaf_count: u64) -> Result<FieldElement, CryptoError> {
        let width = 1u64 << level;
        let start = pos * width;
        if start >= leaf_count {
            return Ok(self.zeros[level]);
        }
        let covered = start + width <= leaf_count;
        if covered || leaf_count == self.leaf_count() {
            // Stored values are exact for fully covered nodes and for the current tree.
            return Ok(self.layers[level][pos as usize]);
        }
        let left = self.node_at(level - 1, pos * 2, leaf_count)?;
        let right = self.node_at(level - 1, pos * 2 + 1, leaf_count)?;
        hash_pair(&left, &right)
    }
}

fn compute_zeros(depth: usize) -> Result<Vec<FieldElement>, CryptoError> {
    let mut zeros = Vec::with_capacity(depth + 1);
    zeros.push(FieldElement::zero());
    for level in 0..depth {
        let z = zeros[level];
        zeros.push(hash_pair(&z, &z)?);
    }
    Ok(zeros)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use shadow_core::ErrorKind;

    fn leaf(i: u64) -> FieldElement {
        FieldElement::from_u64(1_000 + i)
    }

    #[test]
    fn rejects_bad_depth_and_history() {
        assert!(matches!(
            MerkleAccumulator::new(0, 4),
            Err(CryptoError::InvalidDepth(0))
        ));
        assert!(MerkleAccumulator::new(33, 4).is_err());
        assert!(matches!(
            MerkleAccumulator::new(4, 0),
            Err(CryptoError::InvalidHistorySize)
        ));
    }

    #[test]
    fn empty_tree_root_is_top_zero() {
        let acc = MerkleAccumulator::new(3, 4).unwrap();
        assert_eq!(acc.root(), acc.zeros()[3]);
        assert!(acc.is_known_root(&acc.root()));
        assert!(!acc.is_known_root(&FieldElement::zero()));
    }

    #[test]
    fn fills_exactly_to_capacity() {
        let depth = 3;
        let mut acc = MerkleAccumulator::new(depth, 4).unwrap();
        for i in 0..(1u64 << depth) {
            let (idx, _) = acc.insert(leaf(i)).unwrap();
            assert_eq!(idx, i);
        }
        let err = acc.insert(leaf(99)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TreeFull);
        assert_eq!(acc.leaf_count(), 8);
    }

    #[test]
    fn root_matches_naive_recomputation() {
        let mut acc = MerkleAccumulator::new(2, 4).unwrap();
        acc.insert(leaf(0)).unwrap();
        acc.insert(leaf(1)).unwrap();
        let (_, root) = acc.insert(leaf(2)).unwrap();
        let z0 = FieldElement::zero();
        let l = hash_pair(&leaf(0), &leaf(1)).unwrap();
        let r = hash_pair(&leaf(2), &z0).unwrap();
        assert_eq!(root, hash_pair(&l, &r).unwrap());
    }

    #[test]
    fn preview_does_not_mutate() {
        let mut acc = MerkleAccumulator::new(4, 4).unwrap();
        acc.insert(leaf(0)).unwrap();
        let before = acc.root();
        let preview = acc.preview_root(leaf(1)).unwrap();
        assert_eq!(acc.root(), before);
        assert_eq!(acc.leaf_count(), 1);
        let (_, after) = acc.insert(leaf(1)).unwrap();
        assert_eq!(preview, after);
    }

    #[test]
    fn path_for_unknown_index_fails() {
        let mut acc = MerkleAccumulator::new(4, 4).unwrap();
        acc.insert(leaf(0)).unwrap();
        let err = acc.path_for(1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IndexOutOfRange);
    }

    #[test]
    fn path_for_verifies_against_current_root() {
        let mut acc = MerkleAccumulator::new(4, 4).unwrap();
        for i in 0..5 {
            acc.insert(leaf(i)).unwrap();
        }
        for i in 0..5 {
            let proof = acc.path_for(i).unwrap();
            assert_eq!(proof.siblings.len(), 4);
            assert!(proof.verify(&acc.root()));
        }
    }

    #[test]
    fn path_at_reproduces_historical_paths() {
        let mut acc = MerkleAccumulator::new(4, 8).unwrap();
        let (_, r1) = acc.insert(leaf(0)).unwrap();
        let old = acc.path_for(0).unwrap();
        let (_, r2) = acc.insert(leaf(1)).unwrap();
        acc.insert(leaf(2)).unwrap();

        let again = acc.path_at(0, &r1).unwrap();
        assert_eq!(again, old);
        assert!(again.verify(&r1));
        assert!(acc.path_at(0, &r2).unwrap().verify(&r2));
        assert!(!acc.path_for(0).unwrap().verify(&r1));
    }

    #[test]
    fn path_at_rejects_leaf_newer_than_root() {
        let mut acc = MerkleAccumulator::new(4, 8).unwrap();
        let (_, r1) = acc.insert(leaf(0)).unwrap();
        acc.insert(leaf(1)).unwrap();
        let err = acc.path_at(1, &r1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IndexOutOfRange);
    }

    #[test]
    fn history_evicts_oldest() {
        let mut acc = MerkleAccumulator::new(4, 2).unwrap();
        let empty = acc.root();
        let (_, r1) = acc.insert(leaf(0)).unwrap();
        let (_, r2) = acc.insert(leaf(1)).unwrap();
        assert!(!acc.is_known_root(&empty));
        assert!(acc.is_known_root(&r1));
        assert!(acc.is_known_root(&r2));
        let (_, _r3) = acc.insert(leaf(2)).unwrap();
        assert!(!acc.is_known_root(&r1));
        assert_eq!(
            acc.path_at(0, &r1).unwrap_err().kind(),
            ErrorKind::UnknownRoot
        );
    }

    #[test]
    fn history_deserialization_rejects_overfull_window() {
        let mut acc = MerkleAccumulator::new(4, 8).unwrap();
        for i in 0..6 {
            acc.insert(leaf(i)).unwrap();
        }
        let mut json = serde_json::to_value(acc.history()).unwrap();
        json["capacity"] = serde_json::json!(3);
        let err = serde_json::from_value::<RootHistory>(json).unwrap_err();
        assert!(err.to_string().contains("exceeds capacity 3"), "{err}");

        let json = serde_json::json!({ "capacity": 0, "entries": [] });
        assert!(serde_json::from_value::<RootHistory>(json).is_err());
    }

    #[test]
    fn history_deserialization_rejects_reordered_entries() {
        let mut acc = MerkleAccumulator::new(4, 8).unwrap();
        acc.insert(leaf(0)).unwrap();
        acc.insert(leaf(1)).unwrap();
        let mut json = serde_json::to_value(acc.history()).unwrap();
        json["entries"].as_array_mut().unwrap().swap(0, 2);
        assert!(serde_json::from_value::<RootHistory>(json).is_err());
    }

    #[test]
    fn deserialized_history_keeps_evicting() {
        let mut acc = MerkleAccumulator::new(4, 3).unwrap();
        for i in 0..3 {
            acc.insert(leaf(i)).unwrap();
        }
        let json = serde_json::to_string(acc.history()).unwrap();
        let history: RootHistory = serde_json::from_str(&json).unwrap();
        let mut restored = MerkleAccumulator::restore(4, acc.leaves().to_vec(), history).unwrap();
        let empty_root = restored.zeros()[4];
        assert!(!restored.is_known_root(&empty_root));
        let oldest = restored.history().iter().next().unwrap().root;
        restored.insert(leaf(3)).unwrap();
        assert_eq!(restored.history().len(), 3);
        assert!(!restored.is_known_root(&oldest));
    }

    #[test]
    fn restore_rebuilds_identical_state() {
        let mut acc = MerkleAccumulator::new(3, 3).unwrap();
        for i in 0..5 {
            acc.insert(leaf(i)).unwrap();
        }
        let restored =
            MerkleAccumulator::restore(3, acc.leaves().to_vec(), acc.history().clone()).unwrap();
        assert_eq!(restored.root(), acc.root());
        assert_eq!(restored.history(), acc.history());
        assert_eq!(restored.path_for(2).unwrap(), acc.path_for(2).unwrap());
    }

    #[test]
    fn restore_detects_tampered_leaves() {
        let mut acc = MerkleAccumulator::new(3, 3).unwrap();
        for i in 0..3 {
            acc.insert(leaf(i)).unwrap();
        }
        let mut leaves = acc.leaves().to_vec();
        leaves[1] = leaf(77);
        let err = MerkleAccumulator::restore(3, leaves, acc.history().clone()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownRoot);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn every_retained_root_admits_every_earlier_leaf(count in 1u64..12) {
            let mut acc = MerkleAccumulator::new(4, 16).unwrap();
            let mut roots = Vec::new();
            for i in 0..count {
                let (_, r) = acc.insert(leaf(i)).unwrap();
                roots.push((i, r));
            }
            for (inserted_at, root) in &roots {
                for idx in 0..=*inserted_at {
                    let proof = acc.path_at(idx, root).unwrap();
                    prop_assert!(proof.verify(root));
                }
            }
        }
    }
}
