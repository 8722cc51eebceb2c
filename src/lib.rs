// src/lib.rs

//! discogs-mirror library
//!
//! Mirrors Discogs release data into per-shard Git repositories, driven by
//! Redis work queues seeded from the monthly data dumps.

pub mod error;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod queue;
pub mod rate;
pub mod shard;
pub mod storage;
pub mod utils;
