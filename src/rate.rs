//! Token-bucket rate limiting keyed by client identifier.
//!
//! One [`RateLimiter`] instance can gate any number of routes; buckets are
//! created lazily per client key and never evicted. Refill happens lazily on
//! every [`RateLimiter::take`] call from elapsed wall-clock time; there is no
//! background timer.
//!
//! Locking is two-level: the bucket table is guarded by a coarse mutex so that
//! get-or-insert is atomic (at most one bucket per key), while steady-state
//! token accounting only takes the per-bucket mutex. The table lock is
//! released before the refill computation runs.

use crate::context::Ctx;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;

/// Callback invoked instead of the default 429 response when a client is
/// denied. The callback owns the response; the request never reaches the
/// handler either way.
pub type LimitedCallback = Arc<dyn Fn(&Ctx) + Send + Sync>;

/// Shared token-bucket limiter. Cheap to clone behind an [`Arc`] and attach
/// to multiple routes via [`RouteHandle::rate_limit`].
///
/// [`RouteHandle::rate_limit`]: crate::router::RouteHandle::rate_limit
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, Arc<Bucket>>>,
    capacity: f64,
    refill_rate: f64,
    cooldown: f64,
    limited: RwLock<Option<LimitedCallback>>,
}

struct Bucket {
    state: Mutex<BucketState>,
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    /// Create a limiter with the given bucket capacity and refill rate
    /// (tokens per second), cooldown 1.
    #[must_use]
    pub fn new(capacity: f64, refill_rate: f64) -> Self {
        Self::with_cooldown(capacity, refill_rate, 1.0)
    }

    /// Create a limiter with an explicit cooldown divisor. The effective
    /// refill speed is `refill_rate / cooldown` tokens per second.
    #[must_use]
    pub fn with_cooldown(capacity: f64, refill_rate: f64, cooldown: f64) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            capacity,
            refill_rate,
            cooldown,
            limited: RwLock::new(None),
        }
    }

    /// Take one token for `key`. Returns `false` when the bucket holds less
    /// than one token after refill.
    ///
    /// Requests for the same key are serialized by the bucket lock, so token
    /// accounting is exact per client even under concurrent bursts.
    pub fn take(&self, key: &str) -> bool {
        let bucket = {
            let mut table = self
                .buckets
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let bucket = table.entry(key.to_string()).or_insert_with(|| {
                Arc::new(Bucket {
                    state: Mutex::new(BucketState {
                        tokens: self.capacity,
                        last_refill: Instant::now(),
                    }),
                })
            });
            Arc::clone(bucket)
        };
        // Table lock dropped; only this client's bucket is held from here on.
        let mut state = bucket
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_rate / self.cooldown)
            .min(self.capacity);
        state.last_refill = now;
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Install a callback to run on denial in place of the default 429
    /// response.
    pub fn on_limited<F>(&self, callback: F)
    where
        F: Fn(&Ctx) + Send + Sync + 'static,
    {
        let mut slot = self
            .limited
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::new(callback));
    }

    pub(crate) fn limited_callback(&self) -> Option<LimitedCallback> {
        self.limited
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of client buckets currently allocated.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sight_fills_bucket_to_capacity() {
        let limiter = RateLimiter::new(3.0, 1.0);
        assert!(limiter.take("10.0.0.1"));
        assert!(limiter.take("10.0.0.1"));
        assert!(limiter.take("10.0.0.1"));
        assert!(!limiter.take("10.0.0.1"));
        assert_eq!(limiter.bucket_count(), 1);
    }

    #[test]
    fn clients_get_independent_buckets() {
        let limiter = RateLimiter::new(1.0, 1.0);
        assert!(limiter.take("a"));
        assert!(!limiter.take("a"));
        assert!(limiter.take("b"));
        assert_eq!(limiter.bucket_count(), 2);
    }

    #[test]
    fn tokens_never_exceed_capacity() {
        let limiter = RateLimiter::new(2.0, 1000.0);
        assert!(limiter.take("a"));
        assert!(limiter.take("a"));
        std::thread::sleep(std::time::Duration::from_millis(20));
        // Refill is generous, but capped at capacity: two takes, not twenty.
        assert!(limiter.take("a"));
        assert!(limiter.take("a"));
        assert!(!limiter.take("a"));
    }
}
