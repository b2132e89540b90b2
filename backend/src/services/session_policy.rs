//! Sliding-window expiry extension.
//!
//! Sessions are only renewed when they are close to expiring (or expired a
//! moment ago). Renewing on every request would let a busy client keep a
//! session forever.

use chrono::{DateTime, Duration, Utc};

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtensionPolicy {
    /// Lifetime granted from `now` when a session is extended.
    pub extension_window: Duration,
    /// Extend when less than this much time remains (exclusive).
    pub near_expiry_threshold: Duration,
    /// How long after `expires_at` a renewal is still accepted (inclusive).
    pub grace_after_expiry: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionDecision {
    /// Plenty of time left; leave the session alone.
    Keep,
    Extend { new_expires_at: DateTime<Utc> },
    /// Past the grace window; the session must be rejected.
    Terminal,
}

impl Default for ExtensionPolicy {
    fn default() -> Self {
        Self {
            extension_window: Duration::seconds(120),
            near_expiry_threshold: Duration::seconds(30),
            grace_after_expiry: Duration::seconds(30),
        }
    }
}

impl ExtensionPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            extension_window: Duration::seconds(config.session_extension_seconds as i64),
            near_expiry_threshold: Duration::seconds(config.session_near_expiry_seconds as i64),
            grace_after_expiry: Duration::seconds(config.session_grace_seconds as i64),
        }
    }

    pub fn decide(&self, now: DateTime<Utc>, expires_at: DateTime<Utc>) -> ExtensionDecision {
        let remaining = expires_at - now;
        if remaining < -self.grace_after_expiry {
            ExtensionDecision::Terminal
        } else if remaining < self.near_expiry_threshold {
            ExtensionDecision::Extend {
                new_expires_at: now + self.extension_window,
            }
        } else {
            ExtensionDecision::Keep
        }
    }
}
