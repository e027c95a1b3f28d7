//! Blocking single-slot refreshing cache.

use crate::gate::GateState;
use crate::{CacheConfig, CacheMetrics};
use freshen_error::FreshenResult;
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, trace, warn};

pub(crate) const DEFAULT_NAME: &str = "refresh_cache";

/// One cached generation.
///
/// The creation time is fixed at allocation. Everything a caller may observe
/// changing lives behind `inner`, and `ready` wakes waiters when the gate
/// leaves `Pending`.
struct Record<T, E> {
    // `None` is the placeholder installed at construction; it is always stale.
    created_at: Option<Instant>,
    inner: Mutex<RecordInner<T, E>>,
    ready: Condvar,
}

struct RecordInner<T, E> {
    cache_for: Duration,
    state: GateState<T, E>,
}

impl<T, E> Record<T, E> {
    fn placeholder(cache_for: Duration) -> Self {
        Self {
            created_at: None,
            inner: Mutex::new(RecordInner {
                cache_for,
                state: GateState::Abandoned,
            }),
            ready: Condvar::new(),
        }
    }

    fn pending(cache_for: Duration) -> Self {
        Self {
            created_at: Some(Instant::now()),
            inner: Mutex::new(RecordInner {
                cache_for,
                state: GateState::Pending,
            }),
            ready: Condvar::new(),
        }
    }

    fn time_remaining(&self) -> Option<Duration> {
        let created_at = self.created_at?;
        let cache_for = self.inner.lock().cache_for;
        if cache_for.is_zero() {
            return None;
        }
        cache_for.checked_sub(created_at.elapsed())
    }

    fn is_expired(&self) -> bool {
        self.time_remaining().is_none()
    }

    fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.cache_for = Duration::ZERO;
        inner.state.clear();
    }

    fn publish(&self, outcome: Result<T, E>) {
        let mut inner = self.inner.lock();
        inner.state = GateState::Ready(outcome);
        self.ready.notify_all();
    }

    fn abandon(&self) {
        let mut inner = self.inner.lock();
        inner.cache_for = Duration::ZERO;
        inner.state = GateState::Abandoned;
        self.ready.notify_all();
    }
}

impl<T: Clone, E: Clone> Record<T, E> {
    /// Blocks until the gate is signaled. Returns `true` alongside the
    /// outcome when the record was already complete on arrival.
    fn wait(&self) -> (Option<Result<T, E>>, bool) {
        let mut inner = self.inner.lock();
        let was_ready = !inner.state.is_pending();
        while inner.state.is_pending() {
            self.ready.wait(&mut inner);
        }
        (inner.state.outcome(), was_ready)
    }
}

/// Signals the gate as abandoned if the refresher unwinds before publishing.
struct PublishGuard<'a, T, E> {
    record: Option<Arc<Record<T, E>>>,
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
            warn!("Refresh abandoned before publishing, releasing waiters");
            self.metrics.record_abandoned();
            record.abandon();
        }
    }
}

/// What a caller learned while holding the slot lock.
enum Claim<T, E> {
    /// The caller installed this record and must run the producer.
    Refresh(Arc<Record<T, E>>),
    /// Someone else owns this record; wait on its gate.
    Join(Arc<Record<T, E>>),
}

/// A TTL memoization cache holding exactly one value.
///
/// [`get`](Self::get) runs the producer at most once per expiry window no
/// matter how many threads call it concurrently. The first caller to see a
/// stale record becomes the refresher: it installs a fresh pending record,
/// drops the slot lock, and runs the producer. Everyone arriving afterwards
/// blocks on that record until the outcome is published.
///
/// Producer errors are cached exactly like values, for the rest of the window.
///
/// # Example
///
/// ```
/// use freshen_cache::RefreshCache;
/// use std::time::Duration;
///
/// let cache: RefreshCache<u32, String> = RefreshCache::new(Duration::from_secs(60));
///
/// assert_eq!(cache.get(|| Ok(123)), Ok(123));
/// // Still fresh, so the second producer never runs.
/// assert_eq!(cache.get(|| Ok(456)), Ok(123));
///
/// cache.clear();
/// assert_eq!(cache.get(|| Ok(789)), Ok(789));
/// ```
pub struct RefreshCache<T, E> {
    name: String,
    ttl: Duration,
    slot: Mutex<Arc<Record<T, E>>>,
    metrics: CacheMetrics,
}

impl<T, E> RefreshCache<T, E> {
    /// Creates an empty cache whose values stay fresh for `ttl`.
    ///
    /// The first [`get`](Self::get) always runs its producer.
    pub fn new(ttl: Duration) -> Self {
        Self::named(DEFAULT_NAME, ttl)
    }

    /// Creates an empty cache labelled `name` in tracing output.
    pub fn named(name: impl Into<String>, ttl: Duration) -> Self {
        let name = name.into();
        debug!(cache = %name, ttl = ?ttl, "Creating new RefreshCache");
        Self {
            name,
            ttl,
            slot: Mutex::new(Arc::new(Record::placeholder(ttl))),
            metrics: CacheMetrics::new(),
        }
    }

    /// Creates a cache with a zero TTL, so every [`get`](Self::get) runs its
    /// producer. Handy where caching would only get in the way of a test.
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
    ///
    /// A record whose refresh is still running counts from when the refresh
    /// started.
    pub fn time_remaining(&self) -> Option<Duration> {
        self.slot.lock().time_remaining()
    }

    /// Invalidates the current value in place.
    ///
    /// The next [`get`](Self::get) runs its producer. A refresh already in
    /// flight still delivers its outcome to the callers waiting on it, but that
    /// outcome is not served to anyone arriving after the clear.
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
            let record = Arc::new(Record::pending(self.ttl));
            *slot = Arc::clone(&record);
            Claim::Refresh(record)
        } else {
            Claim::Join(Arc::clone(&slot))
        }
    }
}

impl<T: Clone, E: Clone> RefreshCache<T, E> {
    /// Returns the cached outcome, running `producer` if the value is stale.
    ///
    /// Exactly one caller per expiry runs its producer; every caller that
    /// joins that refresh receives a clone of the same `Ok` or `Err`. The
    /// producer runs without the slot lock held.
    ///
    /// If the producer panics, waiters are released and retry with their own
    /// producers, and the panic continues on this thread.
    #[instrument(skip(self, producer), fields(cache = %self.name, ttl = ?self.ttl))]
    pub fn get<F>(&self, producer: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        loop {
            let record = match self.claim() {
                Claim::Refresh(record) => return self.refresh(record, producer),
                Claim::Join(record) => record,
            };

            let (outcome, was_ready) = record.wait();
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

    fn refresh<F>(&self, record: Arc<Record<T, E>>, producer: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        debug!("Record stale, refreshing");
        self.metrics.record_refresh();

        let guard = PublishGuard {
            record: Some(record),
            metrics: &self.metrics,
        };
        let outcome = producer();
        debug!(is_err = outcome.is_err(), "Refresh complete");
        guard.publish(outcome.clone());
        outcome
    }
}

impl<T, E> fmt::Debug for RefreshCache<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshCache")
            .field("name", &self.name)
            .field("ttl", &self.ttl)
            .field("time_remaining", &self.time_remaining())
            .field("metrics", &self.metrics.snapshot())
            .finish()
    }
}
