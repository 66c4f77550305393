//! Time-boxed memoization of the book list and the default statistics.
//!
//! One [`ContextCache`] lives inside each persona. The two entries are gated
//! independently by their own fetch timestamp and a shared time-to-live. State sits
//! behind an async mutex, so concurrent chat turns queue on a refresh instead of
//! refreshing twice.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::library::backend::LibraryBackend;
use crate::library::types::{BookRecord, ReadingStats};

/// Source of "now" for expiry checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    elapsed: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut elapsed = self.elapsed.lock().unwrap_or_else(|e| e.into_inner());
        *elapsed += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let elapsed = *self.elapsed.lock().unwrap_or_else(|e| e.into_inner());
        self.origin + elapsed
    }
}

struct Entry<T> {
    value: Arc<T>,
    fetched_at: Instant,
}

impl<T> Entry<T> {
    fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.fetched_at) <= ttl
    }
}

#[derive(Default)]
struct CacheState {
    books: Option<Entry<Vec<BookRecord>>>,
    stats: Option<Entry<ReadingStats>>,
}

pub struct ContextCache {
    backend: Arc<dyn LibraryBackend>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    state: tokio::sync::Mutex<CacheState>,
}

impl ContextCache {
    pub fn new(backend: Arc<dyn LibraryBackend>, ttl: Duration) -> Self {
        Self::with_clock(backend, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(backend: Arc<dyn LibraryBackend>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend,
            clock,
            ttl,
            state: tokio::sync::Mutex::new(CacheState::default()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The full book list, refreshed when older than the TTL or when forced.
    pub async fn books(&self, force_refresh: bool) -> Arc<Vec<BookRecord>> {
        let mut state = self.state.lock().await;
        let now = self.clock.now();
        if let Some(entry) = &state.books {
            if !force_refresh && entry.is_fresh(now, self.ttl) {
                return Arc::clone(&entry.value);
            }
        }

        tracing::info!(force_refresh, "refreshing books cache");
        let value = Arc::new(self.backend.books().await);
        state.books = Some(Entry {
            value: Arc::clone(&value),
            fetched_at: self.clock.now(),
        });
        value
    }

    /// The default statistics, refreshed when older than the TTL or when forced.
    pub async fn stats(&self, force_refresh: bool) -> Arc<ReadingStats> {
        let mut state = self.state.lock().await;
        let now = self.clock.now();
        if let Some(entry) = &state.stats {
            if !force_refresh && entry.is_fresh(now, self.ttl) {
                return Arc::clone(&entry.value);
            }
        }

        tracing::info!(force_refresh, "refreshing stats cache");
        let value = Arc::new(self.backend.stats(None).await);
        state.stats = Some(Entry {
            value: Arc::clone(&value),
            fetched_at: self.clock.now(),
        });
        value
    }

    /// Drop both entries so the next read goes to the backend.
    pub async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        state.books = None;
        state.stats = None;
        tracing::debug!("context cache invalidated");
    }
}
