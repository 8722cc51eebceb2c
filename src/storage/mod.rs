// src/storage/mod.rs

//! Snapshot persistence and the Git-backed commit log.

mod git;
mod snapshot;

pub use git::GitCommitLog;
pub use snapshot::{PersistOutcome, SnapshotStore};

use std::path::Path;

use crate::error::Result;

/// Append-only history of accepted snapshot changes.
///
/// Paths are relative to the storage partition root. Both operations fail
/// loudly; the work loop decides whether a failure is item-terminal.
pub trait CommitLog {
    /// Stage a file for the next commit.
    fn stage(&mut self, path: &Path) -> Result<()>;

    /// Record one commit for the staged content.
    fn commit(&mut self, message: &str) -> Result<()>;
}
