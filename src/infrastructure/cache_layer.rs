// Page cache - TTL-bounded memo of the rendered index pages

use axum::body::Bytes;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::error::AppResult;

/// Time source for TTL checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = *self.offset.lock().unwrap_or_else(|e| e.into_inner());
        self.origin + offset
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub data: Bytes,
    pub inserted_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.inserted_at) < ttl
    }
}

/// Rendered index pages keyed by page number. Each is served verbatim until
/// `ttl` elapses or `clear` is called, whatever happens to the posts
/// underneath.
pub struct PageCache {
    entries: RwLock<HashMap<usize, CacheEntry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for PageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageCache").field("ttl", &self.ttl).finish()
    }
}

impl PageCache {
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    pub async fn get(&self, page: usize) -> Option<Bytes> {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        entries
            .get(&page)
            .filter(|e| e.is_fresh(now, self.ttl))
            .map(|e| e.data.clone())
    }

    /// Stores `data` for `page` and drops every expired entry.
    pub async fn put(&self, page: usize, data: Bytes) {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, e| e.is_fresh(now, self.ttl));
        entries.insert(
            page,
            CacheEntry {
                data,
                inserted_at: now,
            },
        );
    }

    #[instrument(skip(self))]
    pub async fn clear(&self) {
        self.entries.write().await.clear();
        debug!("Index page cache cleared");
    }

    /// Return the cached page, or render, store and return a fresh one.
    /// Concurrent misses may both render; the last write wins.
    pub async fn get_or_render<F, Fut>(&self, page: usize, render: F) -> AppResult<Bytes>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<Bytes>>,
    {
        if let Some(data) = self.get(page).await {
            debug!(page, "Index page cache hit");
            return Ok(data);
        }

        debug!(page, "Index page cache miss");
        let data = render().await?;
        self.put(page, data.clone()).await;
        Ok(data)
    }
}
