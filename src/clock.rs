//! Time source used by the token manager and the autopilot loop.
//!
//! Expiry checks, refresh backoff and the poll interval all go through
//! [`Clock`] so tests can drive them without waiting on real time.

use std::time::Duration;

use chrono::Utc;

/// Attempts made against the token endpoint before giving up.
pub const REFRESH_ATTEMPTS: u32 = 3;

#[allow(async_fn_in_trait)]
pub trait Clock {
    /// Current time as unix seconds.
    fn now(&self) -> i64;

    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Linear backoff between refresh attempts: 500ms times the attempt number.
pub fn refresh_backoff(attempt: u32) -> Duration {
    Duration::from_millis(500 * u64::from(attempt))
}
