// src/storage/git.rs

//! Commit log over a local Git repository.

use std::path::Path;

use git2::{Repository, Signature};

use crate::error::Result;
use crate::storage::CommitLog;

/// Git-backed commit log with a fixed author identity.
///
/// The repository is the shard's storage partition itself; it is opened
/// (or initialized, for a fresh partition) once at process start.
pub struct GitCommitLog {
    repo: Repository,
    author_name: String,
    author_email: String,
}

impl GitCommitLog {
    pub fn open_or_init(dir: &Path, author_name: &str, author_email: &str) -> Result<Self> {
        let repo = match Repository::open(dir) {
            Ok(repo) => repo,
            Err(_) => Repository::init(dir)?,
        };
        Ok(Self {
            repo,
            author_name: author_name.to_string(),
            author_email: author_email.to_string(),
        })
    }
}

impl CommitLog for GitCommitLog {
    fn stage(&mut self, path: &Path) -> Result<()> {
        let mut index = self.repo.index()?;
        index.add_path(path)?;
        index.write()?;
        Ok(())
    }

    fn commit(&mut self, message: &str) -> Result<()> {
        let mut index = self.repo.index()?;
        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;

        let signature = Signature::now(&self.author_name, &self.author_email)?;

        // No parent on the first commit of a fresh partition.
        let parent = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(_) => None,
        };
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        self.repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;
        Ok(())
    }
}
