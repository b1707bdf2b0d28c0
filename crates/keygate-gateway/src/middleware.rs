//! Gateway middleware.

use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::num::NonZeroU32;

/// Tracked usernames above which idle entries are dropped.
const PRUNE_THRESHOLD: usize = 10_000;

/// Per-username limiter for login attempts.
///
/// Keys are expected to be normalized usernames, so they are bounded in
/// length. Entries whose quota has fully refilled are pruned once more than
/// `PRUNE_THRESHOLD` names are tracked.
pub struct LoginThrottle {
    limiter: RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>,
    prune_threshold: usize,
}

impl LoginThrottle {
    /// Create a throttle allowing `attempts_per_minute` per username.
    #[must_use]
    pub fn new(attempts_per_minute: u32) -> Self {
        let quota =
            Quota::per_minute(NonZeroU32::new(attempts_per_minute).unwrap_or(NonZeroU32::MIN));
        Self::with_quota(quota, PRUNE_THRESHOLD)
    }

    fn with_quota(quota: Quota, prune_threshold: usize) -> Self {
        Self {
            limiter: RateLimiter::keyed(quota),
            prune_threshold,
        }
    }

    /// Record an attempt for a normalized username; `false` once the quota
    /// is spent.
    pub fn check(&self, username: &str) -> bool {
        let allowed = self.limiter.check_key(&username.to_string()).is_ok();
        if !allowed {
            tracing::warn!(username, "login attempts throttled");
        }
        if self.limiter.len() > self.prune_threshold {
            self.prune();
        }
        allowed
    }

    /// Drop entries that no longer restrict anyone.
    pub fn prune(&self) {
        let before = self.limiter.len();
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        tracing::debug!(before, after = self.limiter.len(), "pruned login throttle");
    }

    /// Number of usernames currently tracked.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.limiter.len()
    }
}

impl Default for LoginThrottle {
    fn default() -> Self {
        Self::new(30)
    }
}

impl std::fmt::Debug for LoginThrottle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginThrottle")
            .field("tracked", &self.tracked())
            .finish_non_exhaustive()
    }
}
