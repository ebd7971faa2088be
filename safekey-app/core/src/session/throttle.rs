//! Wrong-PIN throttling.
//!
//! The first four consecutive wrong PINs are free. The fifth and every
//! later failure start a lockout that doubles each time, from 30 seconds
//! up to five minutes. A successful unlock clears the counter.

use std::time::Duration;

use tokio::time::Instant;

/// Consecutive failures that trigger the first lockout.
pub const LOCKOUT_THRESHOLD: u32 = 5;
const BASE_LOCKOUT: Duration = Duration::from_secs(30);
const MAX_LOCKOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Default)]
pub struct PinThrottle {
    failures: u32,
    locked_until: Option<Instant>,
}

impl PinThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaining lockout, if attempts are currently refused.
    pub fn retry_after(&self, now: Instant) -> Option<Duration> {
        self.locked_until
            .filter(|until| *until > now)
            .map(|until| until - now)
    }

    /// Record a wrong PIN. Returns the lockout it started, if any.
    pub fn record_failure(&mut self, now: Instant) -> Option<Duration> {
        self.failures = self.failures.saturating_add(1);
        let lockout = lockout_for(self.failures)?;
        self.locked_until = Some(now + lockout);
        Some(lockout)
    }

    pub fn reset(&mut self) {
        self.failures = 0;
        self.locked_until = None;
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }
}

fn lockout_for(failures: u32) -> Option<Duration> {
    if failures < LOCKOUT_THRESHOLD {
        return None;
    }
    let doublings = (failures - LOCKOUT_THRESHOLD).min(16);
    Some((BASE_LOCKOUT * 2u32.pow(doublings)).min(MAX_LOCKOUT))
}
