// src/pipeline/seed.rs

//! Queue seeder.
//!
//! Diffs a new split-result file against the previous run's and pushes
//! only new/changed release ids onto their shard queues.

use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::Config;
use crate::shard::ShardSpec;

/// One `"<id> <hash>"` line from a split-result file.
pub type ResultEntry = (u64, String);

/// Diff result files and enqueue the new/changed ids. Returns how many were
/// queued.
pub fn run_seeder(config: &Config, new_results: &Path, old_results: Option<&Path>) -> Result<usize> {
    // Check connectivity up front so a dead queue fails before any parsing
    // work is done.
    let client = redis::Client::open(config.queue.url.as_str())?;
    let mut conn = client.get_connection()?;
    redis::cmd("PING").query::<String>(&mut conn)?;

    let new = load_results(new_results)?;
    let old = match old_results {
        Some(path) => load_results(path)?,
        None => Vec::new(),
    };
    log::info!(
        "diffing {} new entries against {} old entries",
        new.len(),
        old.len()
    );

    let spec = ShardSpec::from_config(&config.shards);
    let plan = plan_queues(&new, &old, &spec)?;

    let mut queued = 0;
    let mut pipe = redis::pipe();
    for (queue_name, ids) in &plan {
        log::info!("{queue_name}: queuing {} releases", ids.len());
        for id in ids {
            pipe.cmd("RPUSH").arg(queue_name).arg(*id).ignore();
            queued += 1;
        }
    }
    pipe.query::<()>(&mut conn)?;

    Ok(queued)
}

/// Parse a split-result file. Malformed lines are fatal and carry the line
/// number in the diagnostic.
pub fn load_results(path: &Path) -> Result<Vec<ResultEntry>> {
    let reader = BufReader::new(File::open(path)?);
    let mut entries = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let bad_line = || {
            AppError::dump(format!(
                "{}:{}: expected \"<id> <hash>\", got {line:?}",
                path.display(),
                index + 1
            ))
        };

        let (id, hash) = line.trim().split_once(' ').ok_or_else(|| bad_line())?;
        let id: u64 = id.parse().map_err(|_| bad_line())?;
        if hash.is_empty() || hash.contains(' ') {
            return Err(bad_line());
        }

        entries.push((id, hash.to_string()));
    }

    Ok(entries)
}

/// Group the new/changed ids by their shard queue.
///
/// An entry is skipped only when the old run saw the same id with the same
/// hash; a changed hash re-queues the id.
pub fn plan_queues(
    new: &[ResultEntry],
    old: &[ResultEntry],
    spec: &ShardSpec,
) -> Result<BTreeMap<String, Vec<u64>>> {
    let old_set: HashSet<&ResultEntry> = old.iter().collect();
    let mut plan: BTreeMap<String, Vec<u64>> = BTreeMap::new();

    for entry in new {
        if old_set.contains(entry) {
            continue;
        }
        let shard = spec.shard_for_id(entry.0);
        spec.check(shard)?;
        plan.entry(spec.queue_name(shard)).or_default().push(entry.0);
    }

    Ok(plan)
}
