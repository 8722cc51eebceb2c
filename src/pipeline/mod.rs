//! Pipeline entry points for mirror operations.
//!
//! - `run_crawl`: Consume one shard queue and commit changed releases
//! - `run_split`: Hash releases out of a data dump
//! - `run_seeder`: Queue new/changed releases onto their shards

pub mod crawl;
pub mod seed;
pub mod split;

pub use crawl::run_crawl;
pub use seed::run_seeder;
pub use split::run_split;
