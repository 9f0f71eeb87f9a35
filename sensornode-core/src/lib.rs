//! Wake-cycle core for a battery-powered sensor node
//!
//! The node spends almost all of its life in deep sleep. Every wake-up runs
//! exactly one cycle through this crate:
//!
//! ```text
//! wake cause ─┬─ ColdStart ──► reset records, bring up peripherals, announce
//!             ├─ Timer ──────► read sensors, change detection, publish dirty set
//!             └─ Interrupt ──► latch motion level
//!                      │
//!                      ▼
//!        pending motion? ──► publish latched level (reusing the link)
//!                      │
//!                      ▼
//!        commit acked records ──► schedule next wake ──► power down
//! ```
//!
//! Key constraints:
//! - Only the retention domain survives sleep, so all cross-cycle state
//!   lives in one [`state::DeviceState`] aggregate
//! - Every network wait is bounded; nothing blocks forever on a bad link
//! - A baseline is committed only after its publish was acknowledged
//!
//! ```no_run
//! use sensornode_core::detection::ChangeDetector;
//! use sensornode_core::state::MetricRecord;
//!
//! let detector = ChangeDetector::new(0.2_f32, 300_000);
//! let record = MetricRecord::<f32>::default();
//!
//! let first = detector.evaluate(20.0, &record, 1_000);
//! assert!(first.dirty); // first reading after reset is always reported
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

extern crate alloc;

#[macro_use]
mod logging;

pub mod config;
pub mod constants;
pub mod controller;
pub mod detection;
pub mod discovery;
pub mod errors;
pub mod items;
pub mod latch;
pub mod orchestrator;
pub mod payload;
pub mod sleep;
pub mod state;
pub mod time;
pub mod transport;

// Public API
pub use config::{NodeConfig, TemperatureUnit};
pub use controller::{
    CycleController, CyclePath, CycleReport, MotionOutcome, Platform, Sensors, WakeCause,
};
pub use detection::{ChangeDetector, Evaluation, Metric};
pub use errors::{ConfigError, CycleError, InitError, PayloadError, SensorError, TransportError};
pub use items::{Item, ItemKind, PublishSet};
pub use latch::{InterruptLatch, LatchState};
pub use orchestrator::{Delivery, LinkOutcome, Orchestrator, Outcome, Report};
pub use sleep::{SleepRequest, SleepScheduler};
pub use state::{DeviceState, MemoryStore, MetricRecord, StateStore};
pub use time::{FixedTime, TimeSource, Timestamp};
pub use transport::{Completion, Ticket, Transport};

/// Crate version, reported in the cold-start log line
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}
