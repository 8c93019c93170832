//! Dispatch pacing between recognition calls.
//!
//! The recognition endpoint is rate limited, and images are sent one at a
//! time. Rather than sleeping after every call, the pipeline asks a
//! [`DispatchPolicy`] for permission before each dispatch and reports each
//! completion. [`MinSpacing`] enforces a minimum gap between the end of one
//! call and the start of the next; other policies (token bucket, shared
//! limiter) can be dropped in without touching extraction or selection.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

/// Gatekeeper consulted around every recognition call.
#[async_trait]
pub trait DispatchPolicy: Send {
    /// Resolve once the next call may be dispatched.
    async fn ready(&mut self);

    /// Record that a call has just finished.
    fn record_completion(&mut self);
}

/// Require at least `interval` between a completion and the next dispatch.
#[derive(Debug, Clone)]
pub struct MinSpacing {
    interval: Duration,
    last_completion: Option<Instant>,
}

impl MinSpacing {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_completion: None,
        }
    }

    /// Time still to wait at `now` before the next dispatch.
    pub fn remaining(&self, now: Instant) -> Duration {
        match self.last_completion {
            None => Duration::ZERO,
            Some(done) => (done + self.interval).saturating_duration_since(now),
        }
    }
}

#[async_trait]
impl DispatchPolicy for MinSpacing {
    async fn ready(&mut self) {
        if let Some(done) = self.last_completion {
            let wait = self.remaining(Instant::now());
            if !wait.is_zero() {
                debug!("Pacing: waiting {}ms before next dispatch", wait.as_millis());
                sleep_until(done + self.interval).await;
            }
        }
    }

    fn record_completion(&mut self) {
        self.last_completion = Some(Instant::now());
    }
}

/// No pacing at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unpaced;

#[async_trait]
impl DispatchPolicy for Unpaced {
    async fn ready(&mut self) {}

    fn record_completion(&mut self) {}
}

/// The policy for a configured interval; zero disables pacing.
pub fn policy_for(interval: Duration) -> Box<dyn DispatchPolicy> {
    if interval.is_zero() {
        Box::new(Unpaced)
    } else {
        Box::new(MinSpacing::new(interval))
    }
}
