use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::{num::NonZeroU32, sync::Arc, time::Duration};
use tokio::task::JoinHandle;

use crate::error::AppError;

/// Per-username login throttle.
///
/// Keyed on the normalised username so attempts against one account share a
/// bucket regardless of the client address. The number of tracked usernames
/// is capped; once the cap is reached and pruning frees nothing, every
/// attempt is throttled until buckets refill.
pub struct LoginRateLimiter {
    limiter: DefaultKeyedRateLimiter<String>,
    max_keys: usize,
}

impl LoginRateLimiter {
    pub fn per_minute(max_attempts: u32, max_keys: usize) -> Self {
        let burst = NonZeroU32::new(max_attempts).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: RateLimiter::keyed(Quota::per_minute(burst)),
            max_keys: max_keys.max(1),
        }
    }

    pub fn check(&self, username: &str) -> Result<(), AppError> {
        if self.tracked_keys() >= self.max_keys {
            self.retain_recent();
            if self.tracked_keys() >= self.max_keys {
                tracing::warn!(
                    tracked = self.tracked_keys(),
                    max_keys = self.max_keys,
                    "Login throttle is full"
                );
                return Err(AppError::TooManyRequests);
            }
        }

        let key = normalize_username(username);
        self.limiter.check_key(&key).map_err(|_| {
            tracing::warn!(username = %key, "Login rate limit exceeded");
            AppError::TooManyRequests
        })
    }

    /// Drops keys whose buckets have fully refilled.
    pub fn retain_recent(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    pub fn tracked_keys(&self) -> usize {
        self.limiter.len()
    }

    /// Prunes idle keys every `period`, independently of session cleanup.
    pub fn spawn_pruner(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let before = self.tracked_keys();
                self.retain_recent();
                tracing::debug!(before, after = self.tracked_keys(), "Pruned login throttle");
            }
        })
    }
}

fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}
