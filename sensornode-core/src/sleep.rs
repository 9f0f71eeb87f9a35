//! Sleep scheduling
//!
//! Every cycle ends in deep sleep with two armed wake sources:
//!
//! ```text
//! timer ───────────── sleep_interval ──────────────► Timer wake
//! motion pin ── level == !last_seen_level ─────────► Interrupt wake
//! ```
//!
//! Arming the pin for the opposite of the last seen level means the node
//! wakes on the next transition in either direction, whichever way the
//! sensor currently rests.

use core::time::Duration;

use crate::{
    controller::Platform,
    latch::{InterruptLatch, LatchState},
};

/// Wake sources to arm before powering down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SleepRequest {
    /// Timer wake after this long
    pub timer: Duration,
    /// Pin level that wakes the node
    pub wake_on_level: bool,
}

/// Computes the wake sources for the next sleep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepScheduler {
    interval: Duration,
}

impl SleepScheduler {
    /// Scheduler with a fixed timer interval
    pub const fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Timer interval
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Wake sources given the retained latch state
    pub fn schedule_next(&self, latch: LatchState) -> SleepRequest {
        SleepRequest {
            timer: self.interval,
            wake_on_level: !latch.level,
        }
    }

    /// Arm both wake sources from the current latch and power down
    pub fn enter<P: Platform + ?Sized>(&self, latch: &InterruptLatch, platform: &mut P) -> ! {
        let request = self.schedule_next(latch.snapshot());
        node_info!(
            "Sleeping {} ms, wake on level {}",
            request.timer.as_millis() as u64,
            request.wake_on_level
        );
        platform.power_down(&request)
    }
}
