//! Change Detection with Hysteresis
//!
//! ## Overview
//!
//! Transmitting is by far the most expensive thing the node does, so every
//! fresh reading is first compared against the last value that was actually
//! sent. A metric is *dirty* (worth transmitting) when:
//!
//! 1. it has never been sent since the last reset, or
//! 2. it moved by strictly more than its threshold, or
//! 3. it has not been sent for at least the staleness interval.
//!
//! ```text
//!   value
//!     │        threshold band
//!     │   ┌───────────────────────┐
//!     │ ──┼──── baseline ─────────┼──  inside the band: quiet...
//!     │   └───────────────────────┘
//!     │                              ...until the staleness interval forces
//!     └──────────────────────────────────────────────► a refresh anyway
//! ```
//!
//! ## Boundaries
//!
//! - `delta == threshold` is **not** a change (exclusive). For floats this
//!   holds on the computed `f32` difference, not the decimal one:
//!   `20.0 -> 20.2` against `0.2` differs by `0.2000008` and is a change.
//! - `elapsed == max_staleness` **is** stale (inclusive)
//! - A clock that went backwards counts as stale, so a reset RTC can never
//!   silence a metric
//!
//! ## One algorithm, many numeric types
//!
//! Light arrives as an integer lux count, temperature and humidity as
//! floats. [`ChangeDetector`] is generic over [`Metric`], which only asks
//! for an absolute distance and ordering, so the same code handles all of
//! them and there is no runtime type tag to get wrong.
//!
//! Evaluation is pure: it returns the record the caller *should* persist if
//! the publish succeeds, and leaves the stored record untouched.

use crate::{state::MetricRecord, time::Timestamp};

/// Numeric value that can be change-tracked
pub trait Metric: Copy + PartialOrd + Default {
    /// Absolute difference `|self - other|`
    fn distance(self, other: Self) -> Self;

    /// Whether the value is a usable reading (finite for floats)
    fn is_valid(&self) -> bool {
        true
    }
}

macro_rules! unsigned_metric {
    ($($t:ty),*) => {$(
        impl Metric for $t {
            fn distance(self, other: Self) -> Self {
                self.abs_diff(other)
            }
        }
    )*};
}

macro_rules! signed_metric {
    ($($t:ty),*) => {$(
        impl Metric for $t {
            fn distance(self, other: Self) -> Self {
                // abs_diff is unsigned; saturate instead of wrapping
                Self::try_from(self.abs_diff(other)).unwrap_or(Self::MAX)
            }
        }
    )*};
}

unsigned_metric!(u8, u16, u32, u64);
signed_metric!(i8, i16, i32, i64);

impl Metric for f32 {
    fn distance(self, other: Self) -> Self {
        libm::fabsf(self - other)
    }

    fn is_valid(&self) -> bool {
        self.is_finite()
    }
}

impl Metric for f64 {
    fn distance(self, other: Self) -> Self {
        libm::fabs(self - other)
    }

    fn is_valid(&self) -> bool {
        self.is_finite()
    }
}

/// Result of evaluating one reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation<T> {
    /// Reading should be transmitted this cycle
    pub dirty: bool,

    /// Record to persist once the transmission is acknowledged.
    /// Equal to the input record when not dirty.
    pub record: MetricRecord<T>,
}

/// Why a reading was judged dirty
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DirtyReason {
    /// No valid baseline yet (first reading since reset)
    FirstReading,
    /// Moved by more than the threshold
    Changed,
    /// Unchanged but not sent for the staleness interval
    Stale,
}

impl DirtyReason {
    /// Short label for logs
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FirstReading => "first",
            Self::Changed => "changed",
            Self::Stale => "stale",
        }
    }
}

/// Hysteresis policy for one metric
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChangeDetector<T> {
    threshold: T,
    max_staleness_ms: u64,
}

impl<T: Metric> ChangeDetector<T> {
    /// Detector reporting changes strictly larger than `threshold`, and
    /// anything unsent for `max_staleness_ms` or longer
    pub fn new(threshold: T, max_staleness_ms: u64) -> Self {
        Self {
            threshold,
            max_staleness_ms,
        }
    }

    /// Configured threshold
    pub fn threshold(&self) -> T {
        self.threshold
    }

    /// Configured staleness interval in milliseconds
    pub fn max_staleness_ms(&self) -> u64 {
        self.max_staleness_ms
    }

    /// Decide whether `value` is worth transmitting given the stored `record`.
    ///
    /// `now` must be the cycle timestamp, captured once per wake-up.
    pub fn evaluate(&self, value: T, record: &MetricRecord<T>, now: Timestamp) -> Evaluation<T> {
        match self.classify(value, record, now) {
            Some(_) => Evaluation {
                dirty: true,
                record: MetricRecord {
                    last_value: value,
                    valid: true,
                    last_sent_at: now,
                },
            },
            None => Evaluation {
                dirty: false,
                record: *record,
            },
        }
    }

    /// Reason `value` would be dirty, or `None` if it should stay quiet
    pub fn classify(&self, value: T, record: &MetricRecord<T>, now: Timestamp) -> Option<DirtyReason> {
        if !record.valid {
            return Some(DirtyReason::FirstReading);
        }

        if value.distance(record.last_value) > self.threshold {
            return Some(DirtyReason::Changed);
        }

        let stale = match crate::time::elapsed_ms(record.last_sent_at, now) {
            Some(elapsed) => elapsed >= self.max_staleness_ms,
            None => true,
        };
        stale.then_some(DirtyReason::Stale)
    }
}
