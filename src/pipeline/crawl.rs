// src/pipeline/crawl.rs

//! The crawl-and-commit work loop.
//!
//! One identifier is fully resolved (committed, skipped, or given up on)
//! before the next queue pop. The loop is single-threaded with blocking
//! I/O; horizontal scale comes from running one process per shard.

use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

use rand::Rng;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{Config, CrawlConfig, CrawlStats};
use crate::normalize::{self, FieldPath};
use crate::queue::{RedisQueue, WorkQueue};
use crate::rate::{Directive, RateLimiter};
use crate::shard::ShardSpec;
use crate::storage::{CommitLog, GitCommitLog, PersistOutcome, SnapshotStore};
use crate::utils::http::{self, HttpFetcher, ReleaseFetcher};

/// How a single work item was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Persisted(PersistOutcome),
    /// Gone upstream (404); consumed without a snapshot.
    NotFound,
    /// Retries exhausted or persistence failed; consumed and counted.
    Failed,
}

/// Wire up the crawl loop for one shard and run it until the queue drains.
pub fn run_crawl(config: &Config, shard: u32) -> Result<CrawlStats> {
    let spec = ShardSpec::from_config(&config.shards);
    spec.check(shard)?;

    let queue_name = spec.queue_name(shard);
    let partition = spec.partition_dir(Path::new(&config.store.root), shard);
    fs::create_dir_all(&partition)?;

    log::info!(
        "shard {shard}: queue {queue_name}, partition {}",
        partition.display()
    );

    let mut commit_log = GitCommitLog::open_or_init(
        &partition,
        &config.store.author_name,
        &config.store.author_email,
    )?;
    let store = SnapshotStore::new(&partition);
    let mut queue = RedisQueue::connect(&config.queue.url, queue_name)?;

    let client = http::create_client(&config.api)?;
    let fetcher = HttpFetcher::new(client, config.api.base_url.clone());

    let removals = normalize::parse_removals(&config.crawl.remove_fields)?;
    let rate = RateLimiter::new(&config.rate);

    let mut crawler = Crawler::new(
        &mut queue,
        &fetcher,
        &store,
        &mut commit_log,
        rate,
        removals,
        config.crawl.clone(),
    );
    crawler.run()
}

/// The work loop over one shard queue.
pub struct Crawler<'a> {
    queue: &'a mut dyn WorkQueue,
    fetcher: &'a dyn ReleaseFetcher,
    store: &'a SnapshotStore,
    commit_log: &'a mut dyn CommitLog,
    rate: RateLimiter,
    removals: Vec<FieldPath>,
    config: CrawlConfig,
}

impl<'a> Crawler<'a> {
    pub fn new(
        queue: &'a mut dyn WorkQueue,
        fetcher: &'a dyn ReleaseFetcher,
        store: &'a SnapshotStore,
        commit_log: &'a mut dyn CommitLog,
        rate: RateLimiter,
        removals: Vec<FieldPath>,
        config: CrawlConfig,
    ) -> Self {
        Self {
            queue,
            fetcher,
            store,
            commit_log,
            rate,
            removals,
            config,
        }
    }

    /// Pop and resolve items until the queue is empty.
    ///
    /// An empty queue is the expected terminal condition, not an error.
    /// Non-numeric queue content and a rejected credential are fatal and
    /// propagate out.
    pub fn run(&mut self) -> Result<CrawlStats> {
        let mut stats = CrawlStats::start();

        while let Some(raw) = self.queue.pop()? {
            let id: u64 = raw.trim().parse().map_err(|_| {
                AppError::queue(format!("malformed queue entry {raw:?}: not a release id"))
            })?;
            stats.popped += 1;

            match self.resolve_item(id)? {
                ItemOutcome::Persisted(PersistOutcome::Added) => {
                    stats.added += 1;
                    log::info!("release {id}: added");
                }
                ItemOutcome::Persisted(PersistOutcome::Updated) => {
                    stats.updated += 1;
                    log::info!("release {id}: updated");
                }
                ItemOutcome::Persisted(PersistOutcome::Unchanged) => {
                    stats.unchanged += 1;
                    log::debug!("release {id}: unchanged");
                }
                ItemOutcome::NotFound => stats.not_found += 1,
                ItemOutcome::Failed => stats.failed += 1,
            }
        }

        log::info!("queue drained, stopping");
        stats.finish();
        Ok(stats)
    }

    /// Resolve one identifier: fetch, route through the rate limiter, and
    /// persist. The same identifier is retried across throttling waits and
    /// transient transport failures; it is never dropped silently.
    fn resolve_item(&mut self, id: u64) -> Result<ItemOutcome> {
        let mut attempts: u32 = 0;

        loop {
            let outcome = match self.fetcher.fetch(id) {
                Ok(outcome) => outcome,
                Err(e) => {
                    attempts += 1;
                    if attempts >= self.config.max_fetch_attempts {
                        log::error!("release {id}: giving up after {attempts} fetch attempts: {e}");
                        return Ok(ItemOutcome::Failed);
                    }
                    let wait = self.transient_backoff(attempts);
                    log::warn!(
                        "release {id}: fetch failed ({e}), retrying in {}ms",
                        wait.as_millis()
                    );
                    thread::sleep(wait);
                    continue;
                }
            };

            match self.rate.observe(&outcome.meta) {
                Directive::Proceed => {
                    let Some(body) = outcome.body else {
                        log::error!("release {id}: successful response with no payload");
                        return Ok(ItemOutcome::Failed);
                    };
                    // Persistence failures are item-terminal, not fatal: the
                    // record is logged and counted, and the loop advances.
                    return match self.persist(id, body) {
                        Ok(outcome) => Ok(ItemOutcome::Persisted(outcome)),
                        Err(e) => {
                            log::error!("release {id}: persist failed: {e}");
                            Ok(ItemOutcome::Failed)
                        }
                    };
                }
                Directive::Wait(duration) => {
                    log::info!(
                        "release {id}: rate limited, sleeping {}s",
                        duration.as_secs()
                    );
                    thread::sleep(duration);
                }
                Directive::Skip => {
                    log::info!("release {id}: not found upstream, skipping");
                    return Ok(ItemOutcome::NotFound);
                }
                Directive::Abort => {
                    return Err(AppError::crawl(
                        format!("release {id}"),
                        "credential rejected (401), terminating",
                    ));
                }
            }
        }
    }

    fn persist(&mut self, id: u64, body: Value) -> Result<PersistOutcome> {
        let record = normalize::normalize(body, &self.removals, self.config.strip_thumbnails);
        self.store.persist(id, &record, self.commit_log)
    }

    /// Jittered exponential delay between transport retries.
    fn transient_backoff(&self, attempt: u32) -> Duration {
        let base = self
            .config
            .retry_backoff_ms
            .saturating_mul(1 << (attempt - 1).min(6));
        let jitter = rand::thread_rng().gen_range(0..=base / 2);
        Duration::from_millis(base + jitter)
    }
}
