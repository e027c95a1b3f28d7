//! Single-slot TTL memoization with single-flight refresh.
//!
//! A refreshing cache wraps one expensive operation, the *producer*, and
//! remembers its outcome for a fixed time-to-live. However many callers ask
//! for the value at once, the producer runs at most once per expiry window:
//! the first caller to find the value stale refreshes it, and everyone else
//! waits for that refresh and receives the same outcome.
//!
//! - [`RefreshCache`] for blocking producers called from threads
//! - [`AsyncRefreshCache`] for producers that are futures
//!
//! Producer errors are cached exactly like values and returned verbatim; the
//! cache never retries on its own. A panicking (or, for the async cache,
//! cancelled) refresh never strands its waiters.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod async_cache;
mod cache;
mod config;
mod gate;
mod metrics;

pub use async_cache::AsyncRefreshCache;
pub use cache::RefreshCache;
pub use config::{CacheConfig, CacheConfigBuilder};
pub use metrics::{CacheMetrics, CacheStats};
