// File: src/core/sampling.rs
use crate::core::types::{RatingRecord, UserId};
use rand::rngs::StdRng;
use rand::{seq::index, SeedableRng};
use std::collections::HashSet;
use tracing::info;

/// Keeps the ratings of `floor(n_users * fraction)` users drawn uniformly
/// without replacement. The fraction applies to the unique-user count, not to
/// the number of ratings. Record order is preserved.
///
/// A fraction of 1.0 or more returns a copy of the input.
pub fn sample_users(ratings: &[RatingRecord], fraction: f64, seed: Option<u64>) -> Vec<RatingRecord> {
    if fraction >= 1.0 {
        return ratings.to_vec();
    }

    let mut seen = HashSet::new();
    let users: Vec<UserId> = ratings
        .iter()
        .filter(|r| seen.insert(r.user_id))
        .map(|r| r.user_id)
        .collect();

    let amount = ((users.len() as f64) * fraction).floor() as usize;
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let kept: HashSet<UserId> = index::sample(&mut rng, users.len(), amount)
        .into_iter()
        .map(|i| users[i])
        .collect();

    info!(sampled = kept.len(), total = users.len(), "sampled users");

    ratings
        .iter()
        .filter(|r| kept.contains(&r.user_id))
        .copied()
        .collect()
}
