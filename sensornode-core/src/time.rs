//! Time sources for the wake cycle
//!
//! The controller reads the clock exactly once per cycle and uses that
//! value for every staleness comparison, so a time source only needs to
//! answer "what time is it now".
//!
//! On hardware the clock must keep running through deep sleep (RTC slow
//! clock); a counter that restarts on every wake would make every metric
//! look fresh forever.

/// Timestamp in milliseconds since epoch (or since first power-on for RTC clocks)
pub type Timestamp = u64;

/// Source of time for the node
pub trait TimeSource {
    /// Current timestamp in milliseconds
    fn now(&self) -> Timestamp;
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

/// System time source (requires std)
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTime;

#[cfg(feature = "std")]
impl TimeSource for SystemTime {
    fn now(&self) -> Timestamp {
        use std::time::{SystemTime as StdSystemTime, UNIX_EPOCH};

        StdSystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }
}

/// Fixed time source for testing
#[derive(Debug, Clone)]
pub struct FixedTime {
    timestamp: Timestamp,
}

impl FixedTime {
    /// Clock frozen at `timestamp`
    pub fn new(timestamp: Timestamp) -> Self {
        Self { timestamp }
    }

    /// Jump to an absolute time
    pub fn set(&mut self, timestamp: Timestamp) {
        self.timestamp = timestamp;
    }

    /// Move forward by `ms`
    pub fn advance(&mut self, ms: u64) {
        self.timestamp += ms;
    }
}

impl TimeSource for FixedTime {
    fn now(&self) -> Timestamp {
        self.timestamp
    }
}

/// Milliseconds from `earlier` to `later`, or `None` if the clock went backwards
pub fn elapsed_ms(earlier: Timestamp, later: Timestamp) -> Option<u64> {
    later.checked_sub(earlier)
}
