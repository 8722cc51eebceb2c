// src/queue.rs

//! Work queues backed by Redis lists.

use crate::error::Result;

/// FIFO queue of release ids for one shard.
///
/// `pop` distinguishes an empty queue (`Ok(None)`, end of backlog) from a
/// connectivity failure (`Err`). Entries come back as raw strings so the
/// caller can treat non-numeric content as queue corruption.
pub trait WorkQueue {
    /// Pop one entry from the head of the queue.
    fn pop(&mut self) -> Result<Option<String>>;

    /// Push an id onto the tail of the queue.
    fn push_back(&mut self, id: u64) -> Result<()>;
}

/// A Redis list bound to one shard queue.
pub struct RedisQueue {
    conn: redis::Connection,
    list: String,
}

impl RedisQueue {
    /// Connect and verify the server responds. A connectivity failure here
    /// is fatal at startup rather than mid-loop.
    pub fn connect(url: &str, list: impl Into<String>) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let mut conn = client.get_connection()?;
        redis::cmd("PING").query::<String>(&mut conn)?;
        Ok(Self {
            conn,
            list: list.into(),
        })
    }
}

impl WorkQueue for RedisQueue {
    fn pop(&mut self) -> Result<Option<String>> {
        Ok(redis::cmd("LPOP")
            .arg(&self.list)
            .query(&mut self.conn)?)
    }

    fn push_back(&mut self, id: u64) -> Result<()> {
        redis::cmd("RPUSH")
            .arg(&self.list)
            .arg(id)
            .query::<()>(&mut self.conn)?;
        Ok(())
    }
}
