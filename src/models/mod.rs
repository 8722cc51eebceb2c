// src/models/mod.rs

//! Domain models for the mirror application.

mod config;
mod stats;

pub use config::{
    ApiConfig, Config, CrawlConfig, QueueConfig, RateConfig, ShardConfig, StoreConfig,
};
pub use stats::CrawlStats;
