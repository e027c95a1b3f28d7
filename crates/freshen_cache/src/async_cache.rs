//! Async single-slot refreshing cache.
//!
//! Same contract as [`RefreshCache`](crate::RefreshCache), for producers that
//! are futures. The slot lock is a short synchronous critical section and is
//! never held across an `.await`; waiters park on a `tokio::sync::watch`
//! channel instead of a condition variable.
//!
//! The refresher's future can be dropped mid-refresh (a timeout, a `select!`
//! losing branch, an aborted task). That is treated like a producer panic:
//! the record is abandoned and waiters retry with their own producers.

use crate::cache::DEFAULT_NAME;
use crate::gate::GateState;
use crate::{CacheConfig, CacheMetrics};
use freshen_error::FreshenResult;
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, instrument, trace, warn};

struct AsyncRecord<T, E> {
    created_at: Option<Instant>,
    cache_for: Mutex<Duration>,
    state: watch::Sender<GateState<T, E>>,
}

impl<T, E> AsyncRecord<T, E> {
    fn new(created_at: Option<Instant>, cache_for: Duration, state: GateState<T, E>) -> Self {
        let (state, _) = watch::channel(state);
        Self {
            created_at,
            cache_for: Mutex::new(cache_for),
            state,
        }
    }

    fn time_remaining(&self) -> Option<Duration> {
        let created_at = self.created_at?;
        let cache_for = *self.cache_for.lock();
        if cache_for.is_zero() {
            return None;
        }
        cache_for.checked_sub(created_at.elapsed())
    }

    fn is_expired(&self) -> bool {
        self.time_remaining().is_none()
    }

    fn clear(&self) {
        *self.cache_for.lock() = Duration::ZERO;
        self.state.send_if_modified(|state| {
            let was_pending = state.is_pending();
            state.clear();
            !was_pending
        });
    }

    fn publish(&self, outcome: Result<T, E>) {
        self.state.send_replace(GateState::Ready(outcome));
    }

    fn abandon(&self) {
        *self.cache_for.lock() = Duration::ZERO;
        self.state.send_replace(GateState::Abandoned);
    }
}

impl<T: Clone, E: Clone> AsyncRecord<T, E> {
    async fn wait(&self) -> (Option<Result<T, E>>, bool) {
        let mut ready = self.state.subscribe();
        let was_ready = !ready.borrow().is_pending();
        // The sender lives as long as `self`, so the channel cannot close here.
        let outcome = match ready.wait_for(|state| !state.is_pending()).await {
            Ok(state) => state.outcome(),
            Err(_) => None,
        };
        (outcome, was_ready)
    }
}

struct PublishGuard<'a, T, E> {
    record: Option<Arc<AsyncRecord<T, E>>>,
    metrics: &'a CacheMetrics,
}

impl<T, E> PublishGuard<'_, T, E> {
    fn publish(mut self, outcome: Result<T, E>) {
        if let Some(record) = self.record.take() {
            self.metrics.record_published(outcome.is_err());
            record.publish(outcome);
        }
    }
}

impl<T, E> Drop for PublishGuard<'_, T, E> {
    fn drop(&mut self) {
        if let Some(record) = self.record.take() {
            warn!("Refresh dropped or panicked before publishing, releasing waiters");
            self.metrics.record_abandoned();
            record.abandon();
        }
    }
}

enum Claim<T, E> {
    Refresh(Arc<AsyncRecord<T, E>>),
    Join(Arc<AsyncRecord<T, E>>),
}

/// Async TTL memoization cache holding exactly one value.
///
/// # Example
///
/// ```
/// use freshen_cache::AsyncRefreshCache;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let cache: AsyncRefreshCache<String, String> =
///     AsyncRefreshCache::new(Duration::from_secs(30));
///
/// let token = cache.get(|| async { Ok("token-1".to_string()) }).await;
/// assert_eq!(token.as_deref(), Ok("token-1"));
///
/// let token = cache.get(|| async { Ok("token-2".to_string()) }).await;
/// assert_eq!(token.as_deref(), Ok("token-1"));
/// # }
/// ```
pub struct AsyncRefreshCache<T, E> {
    name: String,
    ttl: Duration,
    slot: Mutex<Arc<AsyncRecord<T, E>>>,
    metrics: CacheMetrics,
}

impl<T, E> AsyncRefreshCache<T, E> {
    /// Creates an empty cache whose values stay fresh for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self::named(DEFAULT_NAME, ttl)
    }

    /// Creates an empty cache labelled `name` in tracing output.
    pub fn named(name: impl Into<String>, ttl: Duration) -> Self {
        let name = name.into();
        debug!(cache = %name, ttl = ?ttl, "Creating new AsyncRefreshCache");
        Self {
            name,
            ttl,
            slot: Mutex::new(Arc::new(AsyncRecord::new(
                None,
                ttl,
                GateState::Abandoned,
            ))),
            metrics: CacheMetrics::new(),
        }
    }

    /// Creates a cache with a zero TTL; every [`get`](Self::get) runs its producer.
    pub fn for_testing() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Creates a cache from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration fails validation.
    pub fn from_config(config: &CacheConfig) -> FreshenResult<Self> {
        config.validate()?;
        let name = config.name().as_deref().unwrap_or(DEFAULT_NAME);
        Ok(Self::named(name, config.ttl()))
    }

    /// Name used in tracing output.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Usage counters for this cache.
    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// Whether the next [`get`](Self::get) would run its producer.
    pub fn is_expired(&self) -> bool {
        self.slot.lock().is_expired()
    }

    /// Freshness left on the current record, `None` once expired.
    pub fn time_remaining(&self) -> Option<Duration> {
        self.slot.lock().time_remaining()
    }

    /// Invalidates the current value in place. Never awaits.
    #[instrument(skip(self), fields(cache = %self.name))]
    pub fn clear(&self) {
        let slot = self.slot.lock();
        slot.clear();
        self.metrics.record_clear();
        debug!("Cleared cached value");
    }

    fn claim(&self) -> Claim<T, E> {
        let mut slot = self.slot.lock();
        if slot.is_expired() {
            let record = Arc::new(AsyncRecord::new(
                Some(Instant::now()),
                self.ttl,
                GateState::Pending,
            ));
            *slot = Arc::clone(&record);
            Claim::Refresh(record)
        } else {
            Claim::Join(Arc::clone(&slot))
        }
    }
}

impl<T: Clone, E: Clone> AsyncRefreshCache<T, E> {
    /// Returns the cached outcome, awaiting `producer` if the value is stale.
    ///
    /// Dropping a waiting call has no effect on the refresh. Dropping the
    /// refreshing call abandons the refresh and wakes its waiters.
    #[instrument(skip(self, producer), fields(cache = %self.name, ttl = ?self.ttl))]
    pub async fn get<F, Fut>(&self, producer: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        loop {
            let record = match self.claim() {
                Claim::Refresh(record) => return self.refresh(record, producer).await,
                Claim::Join(record) => record,
            };

            let (outcome, was_ready) = record.wait().await;
            match outcome {
                Some(outcome) => {
                    if was_ready {
                        self.metrics.record_hit();
                    } else {
                        self.metrics.record_wait();
                    }
                    trace!(was_ready, "Served cached outcome");
                    return outcome;
                }
                None => trace!("Record cleared or abandoned, retrying"),
            }
        }
    }

    async fn refresh<F, Fut>(&self, record: Arc<AsyncRecord<T, E>>, producer: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        debug!("Record stale, refreshing");
        self.metrics.record_refresh();

        let guard = PublishGuard {
            record: Some(record),
            metrics: &self.metrics,
        };
        let outcome = producer().await;
        debug!(is_err = outcome.is_err(), "Refresh complete");
        guard.publish(outcome.clone());
        outcome
    }
}

impl<T, E> fmt::Debug for AsyncRefreshCache<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncRefreshCache")
            .field("name", &self.name)
            .field("ttl", &self.ttl)
            .field("time_remaining", &self.time_remaining())
            .field("metrics", &self.metrics.snapshot())
            .finish()
    }
}
