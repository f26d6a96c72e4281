//! Virtual replay time.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// Playback speeds, slowest first.
pub const SPEEDS: [f64; 10] = [0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0, 250.0, 500.0];

/// Index into [`SPEEDS`] a new clock starts at (1×).
pub const DEFAULT_SPEED_INDEX: usize = 1;

/// A game-time clock in milliseconds that runs at `speed ×` wall time.
///
/// The clock is kept as an anchor pair `(base_ms, anchor)`: virtual time
/// is `base_ms + (now - anchor) * speed`. Every change of speed or pause
/// state first folds the elapsed time into `base_ms`, so earlier time is
/// never rescaled.
#[derive(Debug, Clone)]
pub struct VirtualClock {
    base_ms: f64,
    anchor: Instant,
    speed_index: usize,
    paused: bool,
}

impl VirtualClock {
    /// A running clock at 1× starting at game time `start_ms`.
    pub fn new(start_ms: u64) -> Self {
        Self {
            base_ms: start_ms as f64,
            anchor: Instant::now(),
            speed_index: DEFAULT_SPEED_INDEX,
            paused: false,
        }
    }

    /// Current game time in milliseconds.
    pub fn now(&self) -> u64 {
        self.now_f64().floor() as u64
    }

    fn now_f64(&self) -> f64 {
        if self.paused {
            return self.base_ms;
        }
        self.base_ms + self.anchor.elapsed().as_secs_f64() * 1000.0 * self.speed()
    }

    fn rebase(&mut self) {
        self.base_ms = self.now_f64();
        self.anchor = Instant::now();
    }

    pub fn speed(&self) -> f64 {
        SPEEDS[self.speed_index]
    }

    /// One step faster, saturating at the top speed.
    pub fn speed_up(&mut self) -> f64 {
        self.set_speed_index(self.speed_index + 1)
    }

    /// One step slower, saturating at the bottom speed.
    pub fn speed_down(&mut self) -> f64 {
        self.set_speed_index(self.speed_index.saturating_sub(1))
    }

    fn set_speed_index(&mut self, index: usize) -> f64 {
        let index = index.min(SPEEDS.len() - 1);
        if index != self.speed_index {
            self.rebase();
            self.speed_index = index;
            debug!(speed = self.speed(), "replay speed changed");
        }
        self.speed()
    }

    pub fn pause(&mut self) {
        if !self.paused {
            self.rebase();
            self.paused = true;
        }
    }

    pub fn resume(&mut self) {
        if self.paused {
            self.anchor = Instant::now();
            self.paused = false;
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Jumps forward to `ts`. Moving backwards is ignored.
    pub fn skip_to(&mut self, ts: u64) {
        let ts = ts as f64;
        if ts > self.now_f64() {
            self.base_ms = ts;
            self.anchor = Instant::now();
        }
    }

    /// Wall time until game time reaches `ts`. `None` while paused.
    pub fn wall_until(&self, ts: u64) -> Option<Duration> {
        if self.paused {
            return None;
        }
        let remaining_ms = (ts as f64 - self.now_f64()).max(0.0);
        Some(Duration::from_secs_f64(remaining_ms / 1000.0 / self.speed()))
    }
}
