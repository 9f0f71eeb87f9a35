//! Motion Interrupt Latch
//!
//! The motion sensor drives a GPIO that can wake the device from deep sleep
//! and, while awake, fires an edge interrupt. The latch is the only state
//! shared between that interrupt and the main cycle:
//!
//! ```text
//!   interrupt context                 main cycle
//!   ─────────────────                 ──────────
//!   on_edge(level) ──► [ level | pending ] ──► snapshot()
//!                               ▲                   │ publish level
//!                               └── acknowledge() ◄─┘ (on ack only)
//! ```
//!
//! Both fields live in one `AtomicU8`, so the handler does a single store
//! and the main flow never sees a torn pair. `pending` is cleared only when
//! the level that was published is still the latest one; an edge that lands
//! while the publish is in flight stays pending for the next attempt.
//!
//! On hardware the latch is a `static` placed in retention memory. Hosts
//! that restart between cycles copy it through [`crate::state::DeviceState`]
//! with [`InterruptLatch::adopt`].

use core::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

const LEVEL: u8 = 1 << 0;
const PENDING: u8 = 1 << 1;
// Set once anything has written the latch since power-on
const LIVE: u8 = 1 << 2;

/// Plain copy of the latch fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LatchState {
    /// Last observed logic level of the motion pin
    pub level: bool,

    /// Level changed and has not been acknowledged by the broker yet
    pub pending: bool,
}

impl LatchState {
    const fn encode(self) -> u8 {
        let mut bits = LIVE;
        if self.level {
            bits |= LEVEL;
        }
        if self.pending {
            bits |= PENDING;
        }
        bits
    }

    const fn decode(bits: u8) -> Self {
        Self {
            level: bits & LEVEL != 0,
            pending: bits & PENDING != 0,
        }
    }
}

/// Interrupt-safe two-field latch
#[derive(Debug, Default)]
pub struct InterruptLatch {
    bits: AtomicU8,
}

impl InterruptLatch {
    /// Empty latch (level low, nothing pending)
    pub const fn new() -> Self {
        Self {
            bits: AtomicU8::new(0),
        }
    }

    /// Record an edge. The only call allowed from interrupt context.
    pub fn on_edge(&self, level: bool) {
        let state = LatchState {
            level,
            pending: true,
        };
        self.bits.store(state.encode(), Ordering::Release);
    }

    /// Current level and pending flag
    pub fn snapshot(&self) -> LatchState {
        LatchState::decode(self.bits.load(Ordering::Acquire))
    }

    /// Latch a level sampled by the main flow.
    ///
    /// Used when the device woke on the pin but the handler never ran. An
    /// edge already pending is newer than this sample and wins.
    pub fn sample(&self, level: bool) -> LatchState {
        let sampled = LatchState {
            level,
            pending: true,
        }
        .encode();

        let previous = self
            .bits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                (bits & PENDING == 0).then_some(sampled)
            });

        match previous {
            Ok(_) => LatchState::decode(sampled),
            Err(current) => LatchState::decode(current),
        }
    }

    /// Clear `pending` after `published_level` was acknowledged.
    ///
    /// Returns false (and stays pending) if an edge changed the level since
    /// the snapshot that was published.
    pub fn acknowledge(&self, published_level: bool) -> bool {
        let expected = LatchState {
            level: published_level,
            pending: true,
        };
        let cleared = LatchState {
            level: published_level,
            pending: false,
        };

        self.bits
            .compare_exchange(
                expected.encode(),
                cleared.encode(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Take over a retained copy, unless this latch was already written
    /// since power-on (an edge that fired this boot is newer).
    pub fn adopt(&self, retained: LatchState) {
        let _ = self
            .bits
            .compare_exchange(0, retained.encode(), Ordering::AcqRel, Ordering::Acquire);
    }
}
