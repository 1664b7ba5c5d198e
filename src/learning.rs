// File: src/learning.rs
use crate::core::config::ModelConfig;
use crate::core::cooccurrence::{group_by_user, CooccurrenceAccumulator};
use crate::core::index::ItemIndex;
use crate::core::model::TransitionModel;
use crate::core::sampling::sample_users;
use crate::core::types::{PairStrength, RatingRecord};
use crate::error::Result;
use std::borrow::Cow;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

/// Runs the batch fit: sample users, group, accumulate pairs, build the matrix.
pub struct Learner {
    config: ModelConfig,
    cancel: Option<Arc<AtomicBool>>,
}

impl Learner {
    pub fn new(config: ModelConfig) -> Self {
        Self { config, cancel: None }
    }

    /// Lets another thread abort the fit between user groups.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn fit(&self, ratings: &[RatingRecord]) -> Result<TransitionModel> {
        self.config.validate()?;
        info!(
            ratings = ratings.len(),
            alpha = self.config.alpha,
            sample_fraction = self.config.sample_fraction,
            "fitting transition model"
        );

        let ratings = self.sampled(ratings);
        let pairs = self.accumulate(&ratings)?;

        // Every item in the fitted data gets a row, even without partners.
        let index = ItemIndex::from_ids(ratings.iter().map(|r| r.item_id));
        let kind = self.config.resolve_storage(index.len());
        let model = TransitionModel::from_pair_strengths(&pairs, index, self.config.alpha, kind);

        info!(items = model.item_count(), pairs = pairs.len(), storage = ?kind, "transition model fitted");
        Ok(model)
    }

    /// Raw symmetric pair strengths for the (sampled) ratings, before normalization.
    pub fn pair_strengths(&self, ratings: &[RatingRecord]) -> Result<PairStrength> {
        self.config.validate()?;
        let ratings = self.sampled(ratings);
        self.accumulate(&ratings)
    }

    fn sampled<'a>(&self, ratings: &'a [RatingRecord]) -> Cow<'a, [RatingRecord]> {
        if self.config.sample_fraction < 1.0 {
            Cow::Owned(sample_users(ratings, self.config.sample_fraction, self.config.seed))
        } else {
            Cow::Borrowed(ratings)
        }
    }

    fn accumulate(&self, ratings: &[RatingRecord]) -> Result<PairStrength> {
        let groups = group_by_user(ratings, self.config.alpha)?;
        let accumulator = CooccurrenceAccumulator::new(self.config.max_items_per_user);
        match &self.cancel {
            Some(cancel) => accumulator.accumulate_with_cancel(&groups, cancel),
            None => Ok(accumulator.accumulate(&groups)),
        }
    }
}

/// `fit(ratings, alpha, sample_fraction)` with every other option at its default.
pub fn fit(ratings: &[RatingRecord], alpha: f64, sample_fraction: f64) -> Result<TransitionModel> {
    TransitionModel::fit(ratings, &ModelConfig::new(alpha).with_sample_fraction(sample_fraction))
}
