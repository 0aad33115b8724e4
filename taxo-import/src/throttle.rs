//! Write throttling
//!
//! The engine yields to a [`Throttle`] after the parent pass commits and every
//! `progress_interval` rows, and before each write. Implementations decide
//! what that costs: [`FixedPause`] sleeps a constant duration at the
//! checkpoints, [`RateLimited`] paces individual writes with a token bucket,
//! [`NoPause`] does nothing.

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::time::Duration;
use taxo_common::config::ImportConfig;
use tracing::debug;

/// Where in the run a throttle checkpoint happens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottlePoint {
    /// The parent resolution pass has committed
    AfterParents,
    /// Another batch of rows has been processed
    Batch { processed: usize },
}

/// Admission control between import phases and writes
#[async_trait]
pub trait Throttle: Send + Sync {
    /// Checkpoint reached
    async fn pause(&self, point: ThrottlePoint);

    /// About to persist one term
    async fn before_write(&self) {}
}

/// Constant sleeps at every checkpoint
#[derive(Debug, Clone)]
pub struct FixedPause {
    after_parents: Duration,
    batch: Duration,
}

impl FixedPause {
    pub fn new(after_parents: Duration, batch: Duration) -> Self {
        Self {
            after_parents,
            batch,
        }
    }
}

#[async_trait]
impl Throttle for FixedPause {
    async fn pause(&self, point: ThrottlePoint) {
        let duration = match point {
            ThrottlePoint::AfterParents => self.after_parents,
            ThrottlePoint::Batch { .. } => self.batch,
        };
        if !duration.is_zero() {
            debug!(?point, pause_ms = duration.as_millis() as u64, "Throttle pause");
            tokio::time::sleep(duration).await;
        }
    }
}

/// Token-bucket pacing of writes
pub struct RateLimited {
    limiter: DefaultDirectRateLimiter,
}

impl RateLimited {
    pub fn per_second(writes: NonZeroU32) -> Self {
        Self {
            limiter: RateLimiter::direct(Quota::per_second(writes)),
        }
    }
}

#[async_trait]
impl Throttle for RateLimited {
    async fn pause(&self, _point: ThrottlePoint) {}

    async fn before_write(&self) {
        self.limiter.until_ready().await;
    }
}

/// No throttling at all
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPause;

#[async_trait]
impl Throttle for NoPause {
    async fn pause(&self, _point: ThrottlePoint) {}
}

/// Build the throttle an import configuration asks for
pub fn throttle_for(config: &ImportConfig) -> Box<dyn Throttle> {
    match config.max_writes_per_second.and_then(NonZeroU32::new) {
        Some(rate) => Box::new(RateLimited::per_second(rate)),
        None => Box::new(FixedPause::new(
            Duration::from_millis(config.parent_pause_ms),
            Duration::from_millis(config.batch_pause_ms),
        )),
    }
}
