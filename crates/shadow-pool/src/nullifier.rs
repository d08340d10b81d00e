//! Spent-nullifier set.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use shadow_crypto::NullifierHash;

/// Nullifier hashes of every accepted withdrawal.
///
/// Insertion is the only mutation; a nullifier once spent stays spent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpentNullifiers {
    spent: BTreeSet<NullifierHash>,
}

impl SpentNullifiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_spent(&self, nullifier: &NullifierHash) -> bool {
        self.spent.contains(nullifier)
    }

    /// Mark `nullifier` spent. Returns `false` if it already was.
    pub fn insert(&mut self, nullifier: NullifierHash) -> bool {
        self.spent.insert(nullifier)
    }

    pub fn len(&self) -> usize {
        self.spent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spent.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NullifierHash> {
        self.spent.iter()
    }
}

impl FromIterator<NullifierHash> for SpentNullifiers {
    fn from_iter<I: IntoIterator<Item = NullifierHash>>(iter: I) -> Self {
        Self {
            spent: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shadow_core::FieldElement;

    #[test]
    fn second_insert_reports_already_spent() {
        let n = NullifierHash(FieldElement::from_u64(42));
        let mut set = SpentNullifiers::new();
        assert!(!set.is_spent(&n));
        assert!(set.insert(n));
        assert!(set.is_spent(&n));
        assert!(!set.insert(n));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn serializes_as_sorted_list() {
        let set: SpentNullifiers = [2u64, 1]
            .into_iter()
            .map(|v| NullifierHash(FieldElement::from_u64(v)))
            .collect();
        let json = serde_json::to_string(&set).unwrap();
        let one = FieldElement::from_u64(1).to_hex();
        let two = FieldElement::from_u64(2).to_hex();
        assert_eq!(json, format!("[\"{one}\",\"{two}\"]"));
    }
}
