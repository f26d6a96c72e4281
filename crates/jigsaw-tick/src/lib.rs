//! Timers for the jigsaw server.
//!
//! Two kinds of time live here:
//!
//! - [`TickScheduler`] fires on a fixed wall-clock period. Room actors use
//!   it for persistence (save every few seconds) and idle checks.
//! - [`VirtualClock`] is replay time: it follows the wall clock scaled by a
//!   playback speed, and can be paused or jumped forward.
//!
//! Both read `tokio::time::Instant`, so tests can drive them with
//! `#[tokio::test(start_paused = true)]` and `tokio::time::advance`.
//!
//! # Integration
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         _ = save_timer.wait_for_tick() => self.save_if_dirty(),
//!     }
//! }
//! ```

mod clock;
mod scheduler;

pub use clock::{DEFAULT_SPEED_INDEX, SPEEDS, VirtualClock};
pub use scheduler::{TickConfig, TickInfo, TickScheduler};
