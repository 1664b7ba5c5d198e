// src/core/types.rs
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identifier of a user as it appears in the ratings data.
pub type UserId = u64;

/// Identifier of an item (e.g. a movie) as it appears in the ratings data.
pub type ItemId = u64;

/// One explicit rating. Owned by the caller and never mutated by the core.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub rating: f64,
}

impl RatingRecord {
    pub fn new(user_id: UserId, item_id: ItemId, rating: f64) -> Self {
        Self { user_id, item_id, rating }
    }

    /// Confidence `1 + alpha * rating`, the implicit-feedback weight.
    #[inline]
    pub fn confidence(&self, alpha: f64) -> f64 {
        confidence(self.rating, alpha)
    }
}

#[inline]
pub fn confidence(rating: f64, alpha: f64) -> f64 {
    1.0 + alpha * rating
}

/// Accumulated association strength for ordered pairs `(from, to)`, `from != to`.
pub type PairStrength = HashMap<(ItemId, ItemId), f64>;

/// All items rated by a single user together with their confidences.
#[derive(Debug, Clone, PartialEq)]
pub struct UserGroup {
    pub user_id: UserId,
    /// `(item, confidence)` with distinct items, in input order.
    pub items: Vec<(ItemId, f64)>,
}

/// A single recommendation: the next item and its transition probability.
pub type Recommendation = (ItemId, f64);
