// src/shard.rs

//! Shard naming and partitioning.
//!
//! The upstream id space is partitioned into fixed-width numeric ranges.
//! Each shard owns one Redis list and one storage partition; shard 7 with
//! the default width covers ids in the 7-million bucket.

use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::models::ShardConfig;

/// Pure mapping from shard numbers to queue names and partition directories.
#[derive(Debug, Clone)]
pub struct ShardSpec {
    min: u32,
    max: u32,
    width: u64,
    queue_prefix: String,
    queue_suffix: String,
}

impl ShardSpec {
    pub fn from_config(config: &ShardConfig) -> Self {
        Self {
            min: config.min,
            max: config.max,
            width: config.width,
            queue_prefix: config.queue_prefix.clone(),
            queue_suffix: config.queue_suffix.clone(),
        }
    }

    /// Reject out-of-range shard numbers. Called at configuration time,
    /// never mid-loop.
    pub fn check(&self, shard: u32) -> Result<()> {
        if shard < self.min || shard > self.max {
            return Err(AppError::config(format!(
                "shard {shard} is outside the configured range {}..={}",
                self.min, self.max
            )));
        }
        Ok(())
    }

    /// Queue name for a shard, e.g. `discogs-7M`.
    pub fn queue_name(&self, shard: u32) -> String {
        format!("{}{}{}", self.queue_prefix, shard, self.queue_suffix)
    }

    /// Storage partition directory for a shard.
    pub fn partition_dir(&self, root: &Path, shard: u32) -> PathBuf {
        root.join(shard.to_string())
    }

    /// Shard owning a release id (ceiling division by the shard width).
    pub fn shard_for_id(&self, id: u64) -> u32 {
        id.div_ceil(self.width) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> ShardSpec {
        ShardSpec::from_config(&ShardConfig::default())
    }

    #[test]
    fn queue_name_follows_million_bucket_convention() {
        assert_eq!(spec().queue_name(7), "discogs-7M");
        assert_eq!(spec().queue_name(90), "discogs-90M");
    }

    #[test]
    fn out_of_range_shard_is_rejected() {
        assert!(spec().check(7).is_ok());
        assert!(spec().check(1).is_ok());
        assert!(spec().check(90).is_ok());
        assert!(spec().check(0).is_err());
        assert!(spec().check(91).is_err());
    }

    #[test]
    fn ids_partition_by_ceiling_division() {
        let spec = spec();
        assert_eq!(spec.shard_for_id(1), 1);
        assert_eq!(spec.shard_for_id(1_000_000), 1);
        assert_eq!(spec.shard_for_id(1_000_001), 2);
        assert_eq!(spec.shard_for_id(6_999_999), 7);
    }

    #[test]
    fn partition_dir_is_rooted_per_shard() {
        let dir = spec().partition_dir(Path::new("/srv/discogs"), 7);
        assert_eq!(dir, PathBuf::from("/srv/discogs/7"));
    }
}
