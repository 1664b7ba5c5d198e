// File: src/core/cooccurrence.rs
use crate::core::types::{ItemId, PairStrength, RatingRecord, UserGroup, UserId};
use crate::error::{RecError, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Users between two progress events during accumulation.
pub const PROGRESS_INTERVAL: usize = 10_000;

/// Groups ratings by user (ascending user id) and converts each rating to its
/// confidence. Items keep their input order within a user; a repeated
/// `(user, item)` keeps the highest confidence at its first position.
///
/// Fails on a rating that is not finite or is negative.
pub fn group_by_user(ratings: &[RatingRecord], alpha: f64) -> Result<Vec<UserGroup>> {
    let mut by_user: BTreeMap<UserId, (Vec<(ItemId, f64)>, HashMap<ItemId, usize>)> = BTreeMap::new();

    for record in ratings {
        if !record.rating.is_finite() || record.rating < 0.0 {
            return Err(RecError::InvalidRating {
                user_id: record.user_id,
                item_id: record.item_id,
                rating: record.rating,
            });
        }
        let confidence = record.confidence(alpha);
        let (items, seen) = by_user.entry(record.user_id).or_default();
        match seen.get(&record.item_id) {
            Some(&pos) => {
                if confidence > items[pos].1 {
                    items[pos].1 = confidence;
                }
            }
            None => {
                seen.insert(record.item_id, items.len());
                items.push((record.item_id, confidence));
            }
        }
    }

    Ok(by_user
        .into_iter()
        .map(|(user_id, (items, _))| UserGroup { user_id, items })
        .collect())
}

/// Keeps the `cap` highest-confidence items of a group, ties by ascending item id.
pub fn truncate_group(group: &UserGroup, cap: usize) -> UserGroup {
    if group.items.len() <= cap {
        return group.clone();
    }
    let mut items = group.items.clone();
    items.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    items.truncate(cap);
    UserGroup { user_id: group.user_id, items }
}

/// Builds the pair-strength map one user at a time.
///
/// Every ordered pair `(i, j)` of distinct items from one user gains
/// `min(conf(i), conf(j))`, so `S[(i, j)] == S[(j, i)]` always holds.
#[derive(Debug, Clone, Default)]
pub struct CooccurrenceAccumulator {
    max_items_per_user: Option<usize>,
    pairs: PairStrength,
    users_accumulated: usize,
    users_skipped: usize,
}

impl CooccurrenceAccumulator {
    pub fn new(max_items_per_user: Option<usize>) -> Self {
        Self { max_items_per_user, ..Self::default() }
    }

    /// Adds one user's pairs. O(k^2) for a user with k items.
    /// Users with fewer than two items contribute nothing.
    pub fn add_user(&mut self, group: &UserGroup) {
        if group.items.len() < 2 {
            self.users_skipped += 1;
            return;
        }
        let truncated;
        let items = match self.max_items_per_user {
            Some(cap) if group.items.len() > cap => {
                truncated = truncate_group(group, cap);
                &truncated.items
            }
            _ => &group.items,
        };
        if items.len() < 2 {
            self.users_skipped += 1;
            return;
        }

        for (i, &(from, conf_from)) in items.iter().enumerate() {
            for (j, &(to, conf_to)) in items.iter().enumerate() {
                if i == j {
                    continue;
                }
                *self.pairs.entry((from, to)).or_insert(0.0) += conf_from.min(conf_to);
            }
        }
        self.users_accumulated += 1;
    }

    pub fn users_accumulated(&self) -> usize {
        self.users_accumulated
    }

    pub fn users_skipped(&self) -> usize {
        self.users_skipped
    }

    pub fn pairs(&self) -> &PairStrength {
        &self.pairs
    }

    pub fn finish(self) -> PairStrength {
        debug!(
            users = self.users_accumulated,
            skipped = self.users_skipped,
            pairs = self.pairs.len(),
            "co-occurrence accumulation finished"
        );
        self.pairs
    }

    /// Accumulates every group.
    pub fn accumulate(mut self, groups: &[UserGroup]) -> PairStrength {
        for (done, group) in groups.iter().enumerate() {
            self.add_user(group);
            report_progress(done + 1, groups.len(), self.pairs.len());
        }
        self.finish()
    }

    /// Like [`accumulate`](Self::accumulate) but checks `cancel` before each user.
    pub fn accumulate_with_cancel(mut self, groups: &[UserGroup], cancel: &AtomicBool) -> Result<PairStrength> {
        for (done, group) in groups.iter().enumerate() {
            if cancel.load(Ordering::Relaxed) {
                debug!(users = self.users_accumulated, "accumulation cancelled");
                return Err(RecError::Cancelled);
            }
            self.add_user(group);
            report_progress(done + 1, groups.len(), self.pairs.len());
        }
        Ok(self.finish())
    }
}

/// True every `PROGRESS_INTERVAL` users and on the last one.
pub(crate) fn is_progress_point(done: usize, total: usize) -> bool {
    done > 0 && (done % PROGRESS_INTERVAL == 0 || done == total)
}

fn report_progress(done: usize, total: usize, pairs: usize) {
    if is_progress_point(done, total) {
        info!(done, total, pairs, "accumulating user pairs");
    }
}
