// File: src/dataset.rs
use crate::core::types::{ItemId, RatingRecord, UserId};
use crate::error::Result;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// One row of a MovieLens-style `ratings.csv`. Extra columns such as
/// `timestamp` are ignored.
#[derive(Debug, Deserialize)]
struct CsvRating {
    #[serde(rename = "userId", alias = "user_id")]
    user_id: UserId,
    #[serde(rename = "movieId", alias = "item_id", alias = "itemId")]
    item_id: ItemId,
    rating: f64,
}

impl From<CsvRating> for RatingRecord {
    fn from(row: CsvRating) -> Self {
        RatingRecord::new(row.user_id, row.item_id, row.rating)
    }
}

pub fn load_ratings_csv(path: &Path) -> Result<Vec<RatingRecord>> {
    let reader = csv::Reader::from_path(path)?;
    let ratings = collect_ratings(reader)?;
    info!(path = %path.display(), ratings = ratings.len(), "ratings loaded");
    Ok(ratings)
}

/// Parses ratings CSV (with a header row) from any reader.
pub fn read_ratings<R: Read>(input: R) -> Result<Vec<RatingRecord>> {
    collect_ratings(csv::Reader::from_reader(input))
}

fn collect_ratings<R: Read>(mut reader: csv::Reader<R>) -> Result<Vec<RatingRecord>> {
    let mut ratings = Vec::new();
    for row in reader.deserialize::<CsvRating>() {
        ratings.push(row?.into());
    }
    Ok(ratings)
}

/// Drops low-activity users, then unpopular items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preprocessor {
    pub min_ratings_per_user: usize,
    pub min_ratings_per_item: usize,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self { min_ratings_per_user: 5, min_ratings_per_item: 50 }
    }
}

impl Preprocessor {
    pub fn new(min_ratings_per_user: usize, min_ratings_per_item: usize) -> Self {
        Self { min_ratings_per_user, min_ratings_per_item }
    }

    /// Item counts are taken after the user filter. Order is preserved.
    pub fn filter(&self, ratings: &[RatingRecord]) -> Vec<RatingRecord> {
        info!(ratings = ratings.len(), "preprocessing ratings");

        let user_counts = count_by(ratings, |r| r.user_id);
        let active: Vec<RatingRecord> = ratings
            .iter()
            .filter(|r| user_counts[&r.user_id] >= self.min_ratings_per_user)
            .copied()
            .collect();
        info!(ratings = active.len(), "after filtering inactive users");

        let item_counts = count_by(&active, |r| r.item_id);
        let popular: Vec<RatingRecord> = active
            .iter()
            .filter(|r| item_counts[&r.item_id] >= self.min_ratings_per_item)
            .copied()
            .collect();
        info!(ratings = popular.len(), "after filtering unpopular items");

        popular
    }
}

fn count_by<F: Fn(&RatingRecord) -> u64>(ratings: &[RatingRecord], key: F) -> HashMap<u64, usize> {
    let mut counts = HashMap::new();
    for record in ratings {
        *counts.entry(key(record)).or_insert(0) += 1;
    }
    counts
}
