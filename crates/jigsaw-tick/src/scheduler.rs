//! Fixed-period wall-clock timer for background room work.

use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Time between ticks. `None` means the timer never fires.
    pub period: Option<Duration>,
    /// Random delay (0..max) added to the first tick so games loaded in
    /// the same instant do not all hit the disk in the same instant.
    pub initial_jitter: Duration,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            period: None,
            initial_jitter: Duration::from_millis(250),
        }
    }
}

impl TickConfig {
    pub fn with_period(period: Duration) -> Self {
        Self {
            period: (!period.is_zero()).then_some(period),
            ..Default::default()
        }
    }

    pub fn without_jitter(mut self) -> Self {
        self.initial_jitter = Duration::ZERO;
        self
    }
}

/// Returned by [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickInfo {
    /// Starts at 1.
    pub tick: u64,
    /// Whole periods that went by while the owner was busy. Missed ticks
    /// are never replayed as a burst.
    pub missed: u64,
}

/// Periodic timer meant to sit in a `select!` next to a command channel.
///
/// A late tick fires once and the next one is scheduled a full period
/// after it, so a slow save never causes back-to-back saves.
pub struct TickScheduler {
    config: TickConfig,
    tick_count: u64,
    next_tick: Option<Instant>,
    paused: bool,
}

impl TickScheduler {
    pub fn new(config: TickConfig) -> Self {
        let next_tick = config.period.map(|period| Instant::now() + period + jitter(config.initial_jitter));

        match config.period {
            Some(period) => debug!(period_ms = period.as_millis() as u64, "tick scheduler created"),
            None => debug!("tick scheduler created without a period"),
        }

        Self {
            config,
            tick_count: 0,
            next_tick,
            paused: false,
        }
    }

    pub fn with_period(period: Duration) -> Self {
        Self::new(TickConfig::with_period(period))
    }

    /// Resolves when the next tick is due.
    ///
    /// Pends forever when there is no period or the scheduler is paused.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let (due, period) = match (self.next_tick, self.config.period) {
            (Some(due), Some(period)) if !self.paused => (due, period),
            _ => std::future::pending().await,
        };

        time::sleep_until(due).await;

        let now = Instant::now();
        self.tick_count += 1;
        self.next_tick = Some(now + period);

        let late_by = now.saturating_duration_since(due);
        let missed = (late_by.as_nanos() / period.as_nanos()) as u64;
        if missed > 0 {
            warn!(tick = self.tick_count, missed, "timer fell behind");
        } else {
            trace!(tick = self.tick_count, "tick fired");
        }

        TickInfo {
            tick: self.tick_count,
            missed,
        }
    }

    /// Idempotent.
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!(tick = self.tick_count, "tick scheduler paused");
        }
    }

    /// Restarts the period from now; the paused time is not made up for.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.next_tick = self.config.period.map(|period| Instant::now() + period);
            debug!(tick = self.tick_count, "tick scheduler resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn period(&self) -> Option<Duration> {
        self.config.period
    }
}

fn jitter(max: Duration) -> Duration {
    if max.is_zero() {
        return Duration::ZERO;
    }
    let max_us = (max.as_micros() as u64).max(1);
    Duration::from_micros(rand::rng().random_range(0..max_us))
}
