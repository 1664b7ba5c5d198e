// File: src/core/index.rs
use crate::core::types::ItemId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Frozen bijection between item ids and dense row/column indices.
///
/// Only the id vector is serialized; the reverse map is rebuilt on load so
/// the two directions always agree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ItemId>", into = "Vec<ItemId>")]
pub struct ItemIndex {
    ids: Vec<ItemId>,
    positions: HashMap<ItemId, usize>,
}

impl ItemIndex {
    /// Assigns indices in first-seen order. Repeated ids keep their first index.
    pub fn from_ids<I: IntoIterator<Item = ItemId>>(ids: I) -> Self {
        let mut index = Self { ids: Vec::new(), positions: HashMap::new() };
        for id in ids {
            if let std::collections::hash_map::Entry::Vacant(slot) = index.positions.entry(id) {
                slot.insert(index.ids.len());
                index.ids.push(id);
            }
        }
        index
    }

    #[inline]
    pub fn to_index(&self, id: ItemId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    #[inline]
    pub fn to_id(&self, index: usize) -> Option<ItemId> {
        self.ids.get(index).copied()
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.positions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Item ids in index order.
    pub fn ids(&self) -> &[ItemId] {
        &self.ids
    }
}

impl From<Vec<ItemId>> for ItemIndex {
    fn from(ids: Vec<ItemId>) -> Self {
        Self::from_ids(ids)
    }
}

impl From<ItemIndex> for Vec<ItemId> {
    fn from(index: ItemIndex) -> Self {
        index.ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assigns_discovery_order() {
        let index = ItemIndex::from_ids([30, 10, 30, 20, 10]);
        assert_eq!(index.len(), 3);
        assert_eq!(index.ids(), &[30, 10, 20]);
        assert_eq!(index.to_index(30), Some(0));
        assert_eq!(index.to_index(20), Some(2));
        assert_eq!(index.to_id(1), Some(10));
    }

    #[test]
    fn unknown_lookups_are_none() {
        let index = ItemIndex::from_ids([1, 2]);
        assert_eq!(index.to_index(99), None);
        assert_eq!(index.to_id(2), None);
        assert!(!index.contains(99));
    }

    #[test]
    fn both_directions_agree() {
        let index = ItemIndex::from_ids((0..50).map(|i| i * 7 + 3));
        for (i, &id) in index.ids().iter().enumerate() {
            assert_eq!(index.to_index(id), Some(i));
            assert_eq!(index.to_id(i), Some(id));
        }
    }

    #[test]
    fn serializes_as_id_list() {
        let index = ItemIndex::from_ids([5, 3, 9]);
        let json = serde_json::to_string(&index).unwrap();
        assert_eq!(json, "[5,3,9]");

        let restored: ItemIndex = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, index);
        assert_eq!(restored.to_index(9), Some(2));
    }
}
