//! Pacing between incremental polls.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Waits before the incremental iterator polls again after an empty poll.
#[async_trait]
pub trait PollTimer: Send {
    async fn wait(&mut self);
}

/// Waits one `period` between polls, measured from the previous tick.
pub struct IntervalTimer {
    interval: Interval,
}

impl IntervalTimer {
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }

    pub fn period(&self) -> Duration {
        self.interval.period()
    }
}

#[async_trait]
impl PollTimer for IntervalTimer {
    async fn wait(&mut self) {
        self.interval.tick().await;
    }
}

/// Never waits.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl PollTimer for NoDelay {
    async fn wait(&mut self) {}
}
