// src/core/mod.rs

pub mod config;
pub mod cooccurrence;
pub mod index;
pub mod model;
pub mod sampling;
pub mod storage;
pub mod types;
