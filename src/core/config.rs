// File: src/core/config.rs
use crate::error::{RecError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub const DEFAULT_ALPHA: f64 = 2.0;
pub const DEFAULT_DENSE_MAX_ITEMS: usize = 4096;

/// Which matrix representation backs a fitted model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Dense up to `dense_max_items` items, sparse beyond.
    #[default]
    Auto,
    Dense,
    Sparse,
}

/// Tuning knobs fixed at model-construction time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Confidence slope in `1 + alpha * rating`.
    pub alpha: f64,
    /// Fraction of unique users kept before accumulation, in `(0, 1]`.
    pub sample_fraction: f64,
    /// Seed for user sampling. `None` draws from OS entropy.
    pub seed: Option<u64>,
    /// Cap on items per user; the highest-confidence items are kept.
    pub max_items_per_user: Option<usize>,
    pub storage: StorageKind,
    /// Largest catalog that `StorageKind::Auto` stores densely.
    pub dense_max_items: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            sample_fraction: 1.0,
            seed: None,
            max_items_per_user: None,
            storage: StorageKind::Auto,
            dense_max_items: DEFAULT_DENSE_MAX_ITEMS,
        }
    }
}

impl ModelConfig {
    pub fn new(alpha: f64) -> Self {
        Self { alpha, ..Self::default() }
    }

    pub fn with_sample_fraction(mut self, fraction: f64) -> Self {
        self.sample_fraction = fraction;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_max_items_per_user(mut self, cap: usize) -> Self {
        self.max_items_per_user = Some(cap);
        self
    }

    pub fn with_storage(mut self, storage: StorageKind) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_dense_max_items(mut self, max_items: usize) -> Self {
        self.dense_max_items = max_items;
        self
    }

    /// Reads a JSON config. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: ModelConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.alpha.is_finite() || self.alpha < 0.0 {
            return Err(RecError::invalid_config(
                "alpha",
                self.alpha,
                "a finite value >= 0",
            ));
        }
        if !(self.sample_fraction > 0.0 && self.sample_fraction <= 1.0) {
            return Err(RecError::invalid_config(
                "sample_fraction",
                self.sample_fraction,
                "a value in (0, 1]",
            ));
        }
        if self.max_items_per_user == Some(0) {
            return Err(RecError::invalid_config(
                "max_items_per_user",
                0,
                "at least 1",
            ));
        }
        Ok(())
    }

    /// Resolves `Auto` against the size of the catalog being fitted.
    pub fn resolve_storage(&self, item_count: usize) -> StorageKind {
        match self.storage {
            StorageKind::Auto if item_count <= self.dense_max_items => StorageKind::Dense,
            StorageKind::Auto => StorageKind::Sparse,
            explicit => explicit,
        }
    }
}
