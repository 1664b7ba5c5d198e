// File: src/core/model.rs
use crate::core::config::{ModelConfig, StorageKind};
use crate::core::index::ItemIndex;
use crate::core::storage::{Storage, TransitionStorage};
use crate::core::types::{ItemId, PairStrength, RatingRecord, Recommendation};
use crate::error::{RecError, Result};
use crate::learning::Learner;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A fitted item-to-item transition model.
///
/// Each row of the matrix is the probability distribution over the item
/// that follows the row's item, or all zero when the item never co-occurred
/// with anything. The model is immutable once built; re-fitting produces a
/// new instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionModel {
    storage: Storage,
    index: ItemIndex,
    alpha: f64,
}

impl TransitionModel {
    /// Fits a model from raw ratings: sample, group, accumulate, normalize.
    pub fn fit(ratings: &[RatingRecord], config: &ModelConfig) -> Result<Self> {
        Learner::new(config.clone()).fit(ratings)
    }

    /// Builds the row-stochastic matrix from accumulated pair strengths.
    ///
    /// Pairs naming an item missing from `index` are dropped.
    pub fn from_pair_strengths(pairs: &PairStrength, index: ItemIndex, alpha: f64, kind: StorageKind) -> Self {
        let mut storage = Storage::zeros(kind, index.len());
        let mut dropped = 0usize;

        for (&(from, to), &strength) in pairs {
            match (index.to_index(from), index.to_index(to)) {
                (Some(row), Some(col)) if row != col => storage.set(row, col, strength),
                _ => dropped += 1,
            }
        }
        if dropped > 0 {
            warn!(dropped, "pairs referencing unindexed items were dropped");
        }

        storage.normalize_rows();
        debug!(items = index.len(), storage = ?storage.kind(), "transition matrix built");

        Self { storage, index, alpha }
    }

    /// Top `top_n` next items for `item`, most probable first.
    ///
    /// Unknown items yield an empty vector. The item itself and zero
    /// probabilities are never returned; ties go to the smaller item id.
    pub fn recommend(&self, item: ItemId, top_n: usize) -> Vec<Recommendation> {
        let Some(row) = self.index.to_index(item) else {
            return vec![];
        };
        self.storage
            .row_top_n(row, top_n, |col| self.id_at(col))
            .into_iter()
            .map(|(col, p)| (self.id_at(col), p))
            .collect()
    }

    /// Every recommendation for `item` in `recommend` order. Each call starts over.
    pub fn recommendations(&self, item: ItemId) -> impl Iterator<Item = Recommendation> + '_ {
        let ranked = match self.index.to_index(item) {
            Some(row) => self.storage.row_ranked(row, |col| self.id_at(col)),
            None => vec![],
        };
        ranked.into_iter().map(move |(col, p)| (self.id_at(col), p))
    }

    /// Probability of moving from `from` to `to`; `None` if either is unknown.
    pub fn transition_probability(&self, from: ItemId, to: ItemId) -> Option<f64> {
        let row = self.index.to_index(from)?;
        let col = self.index.to_index(to)?;
        Some(self.storage.get(row, col))
    }

    /// Sum of the item's row: 1.0, or 0.0 for an item without partners.
    pub fn row_sum(&self, item: ItemId) -> Option<f64> {
        self.index.to_index(item).map(|row| self.storage.row_sum(row))
    }

    pub fn contains(&self, item: ItemId) -> bool {
        self.index.contains(item)
    }

    pub fn item_count(&self) -> usize {
        self.index.len()
    }

    /// Item ids in row order.
    pub fn items(&self) -> &[ItemId] {
        self.index.ids()
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn storage_kind(&self) -> StorageKind {
        self.storage.kind()
    }

    pub fn index(&self) -> &ItemIndex {
        &self.index
    }

    /// Verifies that the matrix and the index describe the same catalog.
    ///
    /// Models built by `fit` always pass; snapshots read from disk are
    /// checked before use so a mismatch surfaces as an error, not a panic.
    pub fn check_consistency(&self) -> Result<()> {
        self.storage.check_shape().map_err(RecError::CorruptSnapshot)?;
        if self.storage.dimension() != self.index.len() {
            return Err(RecError::CorruptSnapshot(format!(
                "matrix has {} rows but the index holds {} items",
                self.storage.dimension(),
                self.index.len()
            )));
        }
        if !self.alpha.is_finite() || self.alpha < 0.0 {
            return Err(RecError::CorruptSnapshot(format!("alpha {} is invalid", self.alpha)));
        }
        Ok(())
    }

    // Storage columns are always < index.len(): `from_pair_strengths` sizes
    // the matrix from the index and `check_consistency` guards loaded models.
    // The fallback id 0 is unreachable for a consistent model.
    fn id_at(&self, col: usize) -> ItemId {
        debug_assert!(col < self.index.len(), "column {} outside index of {}", col, self.index.len());
        self.index.to_id(col).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const A: ItemId = 1;
    const B: ItemId = 2;
    const C: ItemId = 3;

    fn abc_pairs() -> PairStrength {
        [((A, B), 9.0), ((B, A), 9.0), ((A, C), 7.0), ((C, A), 7.0), ((B, C), 7.0), ((C, B), 7.0)]
            .into_iter()
            .collect()
    }

    fn abc_model(kind: StorageKind) -> TransitionModel {
        TransitionModel::from_pair_strengths(&abc_pairs(), ItemIndex::from_ids([A, B, C]), 2.0, kind)
    }

    #[test]
    fn rows_normalize_to_probabilities() {
        for kind in [StorageKind::Dense, StorageKind::Sparse] {
            let model = abc_model(kind);
            assert_relative_eq!(model.transition_probability(A, B).unwrap(), 0.5625);
            assert_relative_eq!(model.transition_probability(A, C).unwrap(), 0.4375);
            assert_relative_eq!(model.transition_probability(C, A).unwrap(), 0.5);
            assert_eq!(model.transition_probability(A, A), Some(0.0));
            assert_eq!(model.storage_kind(), kind);
        }
    }

    #[test]
    fn recommend_top_one() {
        let model = abc_model(StorageKind::Dense);
        assert_eq!(model.recommend(A, 1), vec![(B, 0.5625)]);
    }

    #[test]
    fn ties_break_on_smaller_item_id() {
        let model = abc_model(StorageKind::Sparse);
        let recs = model.recommend(C, 5);
        assert_eq!(recs, vec![(A, 0.5), (B, 0.5)]);
    }

    #[test]
    fn unknown_item_is_empty_not_error() {
        let model = abc_model(StorageKind::Dense);
        assert!(model.recommend(42, 10).is_empty());
        assert_eq!(model.recommendations(42).count(), 0);
        assert_eq!(model.transition_probability(42, A), None);
        assert_eq!(model.row_sum(42), None);
    }

    #[test]
    fn item_without_partners_has_zero_row() {
        let index = ItemIndex::from_ids([A, B, C, 4]);
        let model = TransitionModel::from_pair_strengths(&abc_pairs(), index, 2.0, StorageKind::Dense);
        assert_eq!(model.row_sum(4), Some(0.0));
        assert!(model.recommend(4, 3).is_empty());
        assert!(model.contains(4));
    }

    #[test]
    fn pairs_outside_the_index_are_dropped() {
        let mut pairs = abc_pairs();
        pairs.insert((A, 99), 100.0);
        pairs.insert((99, B), 100.0);
        let model = TransitionModel::from_pair_strengths(&pairs, ItemIndex::from_ids([A, B, C]), 2.0, StorageKind::Dense);
        assert_eq!(model, abc_model(StorageKind::Dense));
    }

    #[test]
    fn self_pairs_never_land_on_the_diagonal() {
        let mut pairs = abc_pairs();
        pairs.insert((A, A), 50.0);
        let model = TransitionModel::from_pair_strengths(&pairs, ItemIndex::from_ids([A, B, C]), 2.0, StorageKind::Dense);
        assert_eq!(model.transition_probability(A, A), Some(0.0));
    }

    #[test]
    fn lazy_iterator_restarts_and_matches_recommend() {
        let model = abc_model(StorageKind::Dense);
        let first: Vec<_> = model.recommendations(A).collect();
        let second: Vec<_> = model.recommendations(A).collect();
        assert_eq!(first, second);
        assert_eq!(first, model.recommend(A, usize::MAX));
        assert_eq!(model.recommendations(A).take(1).collect::<Vec<_>>(), model.recommend(A, 1));
    }

    #[test]
    fn fitted_models_are_consistent() {
        for kind in [StorageKind::Dense, StorageKind::Sparse] {
            assert!(abc_model(kind).check_consistency().is_ok());
        }
    }

    #[test]
    fn matrix_index_mismatch_is_reported() {
        let model = TransitionModel {
            storage: Storage::zeros(StorageKind::Dense, 1),
            index: ItemIndex::from_ids([A, B, C]),
            alpha: 2.0,
        };
        assert!(matches!(model.check_consistency(), Err(RecError::CorruptSnapshot(_))));
    }

    #[test]
    fn model_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TransitionModel>();

        let model = std::sync::Arc::new(abc_model(StorageKind::Dense));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let model = model.clone();
                std::thread::spawn(move || model.recommend(A, 1))
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), vec![(B, 0.5625)]);
        }
    }

    #[test]
    fn empty_model_answers_nothing() {
        let model = TransitionModel::from_pair_strengths(&PairStrength::new(), ItemIndex::from_ids(Vec::new()), 0.0, StorageKind::Sparse);
        assert_eq!(model.item_count(), 0);
        assert!(model.recommend(A, 3).is_empty());
    }
}
