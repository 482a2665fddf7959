//! Traversal queue: a dedupe-aware work queue feeding both page kinds
//! through a single worker loop.
//!
//! The dedupe contract is the core of the queue: the set of keys ever
//! submitted survives entries being handled, so re-processing a listing
//! page (after a retry or a resumed run) never double-enqueues downstream
//! work.

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use tracing::warn;

use crate::error::{CrawlerError, Result};
use crate::types::{DedupeKey, PageRequest};

/// Persistent, dedupe-aware work queue.
#[async_trait]
pub trait RequestQueue: Send + Sync {
    /// Submit a request. Returns false when the dedupe key has been seen
    /// before (the request is dropped).
    async fn submit(&self, request: &PageRequest) -> Result<bool>;

    /// The oldest unhandled request, or None when the queue is drained.
    async fn next(&self) -> Result<Option<PageRequest>>;

    /// Mark a request as handled so it is not served again. The dedupe key
    /// stays recorded.
    async fn mark_handled(&self, key: &DedupeKey) -> Result<()>;
}

#[derive(Default)]
struct MemoryQueueInner {
    pending: VecDeque<PageRequest>,
    seen: HashSet<DedupeKey>,
}

/// In-memory queue for one-shot runs and tests. State is lost on restart.
#[derive(Default)]
pub struct MemoryQueue {
    inner: Mutex<MemoryQueueInner>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of requests waiting to be served.
    pub fn pending_count(&self) -> usize {
        self.inner.lock().unwrap().pending.len()
    }

    /// Number of distinct dedupe keys ever submitted.
    pub fn seen_count(&self) -> usize {
        self.inner.lock().unwrap().seen.len()
    }
}

#[async_trait]
impl RequestQueue for MemoryQueue {
    async fn submit(&self, request: &PageRequest) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.seen.insert(request.dedupe_key()) {
            return Ok(false);
        }
        inner.pending.push_back(request.clone());
        Ok(true)
    }

    async fn next(&self) -> Result<Option<PageRequest>> {
        Ok(self.inner.lock().unwrap().pending.pop_front())
    }

    async fn mark_handled(&self, _key: &DedupeKey) -> Result<()> {
        // next() already removed the entry; the seen set keeps the key
        Ok(())
    }
}

/// SQLite-backed queue for resumable runs.
///
/// Handled entries are flagged rather than deleted: the dedupe set must
/// outlive the entries, and a run cancelled mid-page resumes by re-serving
/// whatever was never marked handled.
pub struct SqliteQueue {
    pool: SqlitePool,
}

impl SqliteQueue {
    /// Open (and migrate) a queue at the given connection URL.
    ///
    /// # Example URLs
    /// - `sqlite::memory:` - ephemeral, for tests
    /// - `sqlite:./queue.db?mode=rwc` - create if not exists
    pub async fn new(database_url: &str) -> Result<Self> {
        // A single connection: the worker loop is sequential, and an
        // in-memory database exists per-connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await
            .map_err(|e| CrawlerError::Queue(e.to_string().into()))?;

        let queue = Self { pool };
        queue.run_migrations().await?;
        Ok(queue)
    }

    /// An in-memory queue (for testing).
    pub async fn in_memory() -> Result<Self> {
        Self::new("sqlite::memory:").await
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS requests (
                dedupe_key TEXT PRIMARY KEY,
                request TEXT NOT NULL,
                handled INTEGER NOT NULL DEFAULT 0,
                enqueued_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_requests_handled ON requests(handled);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| CrawlerError::Queue(e.to_string().into()))?;

        Ok(())
    }
}

#[async_trait]
impl RequestQueue for SqliteQueue {
    async fn submit(&self, request: &PageRequest) -> Result<bool> {
        let payload = serde_json::to_string(request)?;
        let result = sqlx::query(
            "INSERT OR IGNORE INTO requests (dedupe_key, request, enqueued_at)
             VALUES (?, ?, ?)",
        )
        .bind(request.dedupe_key().as_str())
        .bind(payload)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| CrawlerError::Queue(e.to_string().into()))?;

        Ok(result.rows_affected() == 1)
    }

    async fn next(&self) -> Result<Option<PageRequest>> {
        loop {
            let row = sqlx::query(
                "SELECT dedupe_key, request FROM requests
                 WHERE handled = 0 ORDER BY rowid LIMIT 1",
            )
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CrawlerError::Queue(e.to_string().into()))?;

            let Some(row) = row else {
                return Ok(None);
            };

            let key: String = row.get("dedupe_key");
            let payload: String = row.get("request");

            match serde_json::from_str::<PageRequest>(&payload) {
                Ok(request) => return Ok(Some(request)),
                Err(error) => {
                    // Never decode a corrupt entry into defaults (that
                    // could restart a pagination chain from offset 0).
                    // Drop it and move on.
                    warn!(dedupe_key = %key, %error, "skipping corrupt queue entry");
                    sqlx::query("UPDATE requests SET handled = 1 WHERE dedupe_key = ?")
                        .bind(&key)
                        .execute(&self.pool)
                        .await
                        .map_err(|e| CrawlerError::Queue(e.to_string().into()))?;
                }
            }
        }
    }

    async fn mark_handled(&self, key: &DedupeKey) -> Result<()> {
        sqlx::query("UPDATE requests SET handled = 1 WHERE dedupe_key = ?")
            .bind(key.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| CrawlerError::Queue(e.to_string().into()))?;
        Ok(())
    }
}
