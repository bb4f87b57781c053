//! # Backoff policy for idle polling.
//!
//! [`BackoffPolicy`] controls how the sleep between two empty reads of a tailed
//! file grows while nothing new is written. It is parameterized by:
//! - [`BackoffPolicy::first`] the initial sleep;
//! - [`BackoffPolicy::factor`] the multiplicative growth factor;
//! - [`BackoffPolicy::max`] the cap.
//!
//! The sleep after `n` consecutive empty reads is `first × factor^n`, clamped to
//! `max`. The counter is owned by the caller and reset when data arrives, so an
//! active log is always re-read after `first`.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use testvisor::BackoffPolicy;
//!
//! let poll = BackoffPolicy {
//!     first: Duration::from_millis(1),
//!     max: Duration::from_millis(50),
//!     factor: 2.0,
//! };
//!
//! assert_eq!(poll.next(0), Duration::from_millis(1));
//! assert_eq!(poll.next(3), Duration::from_millis(8));
//! assert_eq!(poll.next(10), Duration::from_millis(50));
//! ```

use std::time::Duration;

/// Idle-poll backoff policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Sleep after the first empty read.
    pub first: Duration,
    /// Maximum sleep between two reads.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
}

impl Default for BackoffPolicy {
    /// Returns a policy with:
    /// - `first = 1ms`;
    /// - `factor = 2.0`;
    /// - `max = 50ms`.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(1),
            max: Duration::from_millis(50),
            factor: 2.0,
        }
    }
}

impl BackoffPolicy {
    /// A policy that always sleeps `interval`.
    pub fn constant(interval: Duration) -> Self {
        Self {
            first: interval,
            max: interval,
            factor: 1.0,
        }
    }

    /// Computes the sleep after `idle` consecutive empty reads (0-indexed).
    ///
    /// # Notes
    /// - `factor == 1.0` keeps the sleep constant at `first` (up to `max`).
    /// - Non-finite or negative intermediate values clamp to `max`.
    pub fn next(&self, idle: u32) -> Duration {
        let max_secs = self.max.as_secs_f64();
        let exp = idle.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        if !secs.is_finite() || secs < 0.0 || secs > max_secs {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        }
    }
}
