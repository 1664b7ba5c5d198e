// src/lib.rs

pub mod core;
pub mod dataset;
pub mod error;
pub mod learning;
pub mod persistence;

pub use crate::core::config::{ModelConfig, StorageKind};
pub use crate::core::model::TransitionModel;
pub use crate::core::types::{ItemId, RatingRecord, Recommendation, UserId};
pub use crate::error::{RecError, Result};
pub use crate::learning::{fit, Learner};
