//! Write pacing for the spreadsheet sink.
//!
//! Google Sheets enforces a per-user write quota (60 requests per minute by
//! default). Row writes go through a [`Pacer`] so the driver never exceeds
//! the configured rate.

use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};

/// Admission control for row writes.
#[async_trait]
pub trait Pacer: Send + Sync {
    /// Wait until the next write may proceed.
    async fn ready(&self);
}

/// Token-bucket pacer: one write per period, no bursting.
///
/// The first write proceeds immediately; each later write waits until a full
/// period has passed since the previous one.
pub struct GovernorPacer {
    limiter: DefaultDirectRateLimiter,
    period: Duration,
}

impl std::fmt::Debug for GovernorPacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GovernorPacer")
            .field("period", &self.period)
            .finish_non_exhaustive()
    }
}

impl GovernorPacer {
    /// Create a pacer allowing one write per `period`.
    ///
    /// Returns `None` for a zero period; use [`Unpaced`] instead.
    #[must_use]
    pub fn new(period: Duration) -> Option<Self> {
        let quota = Quota::with_period(period)?.allow_burst(NonZeroU32::MIN);
        Some(Self {
            limiter: RateLimiter::direct(quota),
            period,
        })
    }

    /// Minimum spacing between writes.
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }
}

#[async_trait]
impl Pacer for GovernorPacer {
    async fn ready(&self) {
        self.limiter.until_ready().await;
    }
}

/// Pacer that never waits.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unpaced;

#[async_trait]
impl Pacer for Unpaced {
    async fn ready(&self) {}
}

/// Build the pacer for a configured write delay.
///
/// A zero delay disables pacing.
#[must_use]
pub fn pacer_for(delay: Duration) -> Box<dyn Pacer> {
    match GovernorPacer::new(delay) {
        Some(pacer) => Box::new(pacer),
        None => Box::new(Unpaced),
    }
}

#[async_trait]
impl<P: Pacer + ?Sized> Pacer for Box<P> {
    async fn ready(&self) {
        (**self).ready().await;
    }
}
