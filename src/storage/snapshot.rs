// src/storage/snapshot.rs

//! One-file-per-release snapshot store.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::Result;
use crate::normalize::to_canonical_bytes;
use crate::storage::CommitLog;

/// What `persist` did with a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    /// No snapshot existed; one was written and committed.
    Added,
    /// The snapshot differed; it was rewritten and committed.
    Updated,
    /// The snapshot was byte-identical; nothing written, nothing committed.
    Unchanged,
}

/// Snapshot storage for one shard partition.
///
/// Each release is stored as `{id}.json`, serialized canonically so the
/// stored bytes deserialize back to the exact value that was persisted.
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the snapshot file for a release id.
    pub fn snapshot_path(&self, id: u64) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Write the record if it is new or changed, and record exactly one
    /// commit for it. An unchanged record is the expected common case under
    /// re-crawl and produces no commit at all, since the commit log does
    /// not deduplicate identical content by itself.
    pub fn persist(
        &self,
        id: u64,
        record: &Value,
        commit_log: &mut dyn CommitLog,
    ) -> Result<PersistOutcome> {
        let path = self.snapshot_path(id);
        let existed = path.exists();

        if existed {
            match serde_json::from_slice::<Value>(&fs::read(&path)?) {
                Ok(previous) if previous == *record => return Ok(PersistOutcome::Unchanged),
                Ok(_) => {}
                Err(e) => {
                    // A corrupt snapshot heals on the next crawl.
                    log::warn!("snapshot {id}.json is unreadable ({e}), rewriting");
                }
            }
        }

        fs::write(&path, to_canonical_bytes(record)?)?;

        let file_name = format!("{id}.json");
        commit_log.stage(Path::new(&file_name))?;

        if existed {
            commit_log.commit(&format!("Update {id}"))?;
            Ok(PersistOutcome::Updated)
        } else {
            commit_log.commit(&format!("Add {id}"))?;
            Ok(PersistOutcome::Added)
        }
    }
}
