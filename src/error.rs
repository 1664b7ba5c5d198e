// File: src/error.rs
use crate::core::types::{ItemId, UserId};
use thiserror::Error;

/// Everything that can go wrong while fitting, loading or saving a model.
///
/// Unknown items and users with a single rating are *not* errors; they are
/// ordinary outcomes handled inside the model.
#[derive(Debug, Error)]
pub enum RecError {
    #[error("invalid config: {param} = {value}, expected {constraint}")]
    InvalidConfig {
        param: String,
        value: String,
        constraint: String,
    },

    #[error("invalid rating {rating} for user {user_id}, item {item_id}: must be finite and non-negative")]
    InvalidRating {
        user_id: UserId,
        item_id: ItemId,
        rating: f64,
    },

    #[error("fit cancelled")]
    Cancelled,

    #[error("unsupported model format version {found} (max supported {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("corrupt model snapshot: {0}")]
    CorruptSnapshot(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("ratings file error: {0}")]
    Csv(#[from] csv::Error),
}

impl RecError {
    pub(crate) fn invalid_config(
        param: &str,
        value: impl ToString,
        constraint: &str,
    ) -> Self {
        RecError::InvalidConfig {
            param: param.to_string(),
            value: value.to_string(),
            constraint: constraint.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RecError>;
