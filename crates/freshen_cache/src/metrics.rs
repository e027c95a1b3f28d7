//! Counters describing how a refreshing cache is being used.

use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Metrics collector for one cache instance.
///
/// Cloning is cheap and every clone observes the same counters.
#[derive(Debug, Clone, Default)]
pub struct CacheMetrics {
    inner: Arc<CacheMetricsInner>,
}

#[derive(Debug, Default)]
struct CacheMetricsInner {
    // Lookups served from a record that was already complete
    hits: AtomicU64,
    // Lookups that joined a refresh still in flight
    waits: AtomicU64,

    refreshes: AtomicU64,
    errors: AtomicU64,
    clears: AtomicU64,
    abandoned: AtomicU64,

    last_refresh: parking_lot::Mutex<Option<Instant>>,
}

impl CacheMetrics {
    /// Creates a new metrics collector with every counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_hit(&self) {
        self.inner.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_wait(&self) {
        self.inner.waits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_refresh(&self) {
        self.inner.refreshes.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts an error outcome and stamps the refresh time.
    pub(crate) fn record_published(&self, is_err: bool) {
        if is_err {
            self.inner.errors.fetch_add(1, Ordering::Relaxed);
        }
        *self.inner.last_refresh.lock() = Some(Instant::now());
    }

    pub(crate) fn record_clear(&self) {
        self.inner.clears.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_abandoned(&self) {
        self.inner.abandoned.fetch_add(1, Ordering::Relaxed);
    }

    /// Lookups answered by a record that had already completed.
    pub fn hits(&self) -> u64 {
        self.inner.hits.load(Ordering::Relaxed)
    }

    /// Lookups that blocked on a refresh started by another caller.
    pub fn waits(&self) -> u64 {
        self.inner.waits.load(Ordering::Relaxed)
    }

    /// Producer invocations.
    pub fn refreshes(&self) -> u64 {
        self.inner.refreshes.load(Ordering::Relaxed)
    }

    /// Refreshes whose producer returned an error.
    pub fn errors(&self) -> u64 {
        self.inner.errors.load(Ordering::Relaxed)
    }

    /// Calls to `clear`.
    pub fn clears(&self) -> u64 {
        self.inner.clears.load(Ordering::Relaxed)
    }

    /// Refreshes that panicked or were cancelled before publishing.
    pub fn abandoned(&self) -> u64 {
        self.inner.abandoned.load(Ordering::Relaxed)
    }

    /// Time since the last refresh published an outcome.
    pub fn time_since_refresh(&self) -> Option<Duration> {
        self.inner.last_refresh.lock().map(|instant| instant.elapsed())
    }

    /// Creates a serializable snapshot of current metrics.
    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits(),
            waits: self.waits(),
            refreshes: self.refreshes(),
            errors: self.errors(),
            clears: self.clears(),
            abandoned: self.abandoned(),
            millis_since_refresh: self
                .time_since_refresh()
                .map(|d| d.as_millis().min(u64::MAX as u128) as u64),
        }
    }
}

/// Serializable snapshot of cache metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups served from a completed record
    pub hits: u64,
    /// Lookups that joined an in-flight refresh
    pub waits: u64,
    /// Producer invocations
    pub refreshes: u64,
    /// Refreshes that produced an error
    pub errors: u64,
    /// Calls to `clear`
    pub clears: u64,
    /// Refreshes abandoned by a panic or cancellation
    pub abandoned: u64,
    /// Milliseconds since the last published refresh
    pub millis_since_refresh: Option<u64>,
}
