//! Error Types for the Wake Cycle
//!
//! ## Design Philosophy
//!
//! Errors are returned from code that runs once per wake-up on a device with
//! a few kilobytes of spare RAM, so they follow the same rules everywhere:
//!
//! 1. **Copy and small**: no `String`, only `&'static str` and integers.
//! 2. **Typed, never boolean**: every variant says *why* something did not
//!    happen, so the cycle controller can pick retry-vs-abandon per kind.
//! 3. **Explicit**: failures are values consumed by the caller in the same
//!    cycle. Nothing unwinds.
//!
//! ## Categories
//!
//! ### Transient (absorbed, retried next cycle)
//! - [`SensorError`]: a bus read failed or returned garbage
//! - [`TransportError`]: the transport refused to start an operation
//! - [`PayloadError`]: a topic or payload did not fit its fixed buffer
//!
//! ### Fatal (device restarts)
//! - [`InitError`] during cold start, surfaced as [`CycleError::Fatal`]
//!
//! ### Configuration
//! - [`ConfigError`]: rejected before the first cycle ever runs
//!
//! ```rust
//! use sensornode_core::errors::SensorError;
//!
//! fn describe(err: SensorError) -> &'static str {
//!     match err {
//!         SensorError::Bus { .. } => "wiring or pull-ups",
//!         SensorError::Timeout { .. } => "sensor asleep or stuck",
//!         SensorError::InvalidData { .. } => "reading discarded",
//!     }
//! }
//! ```

use thiserror_no_std::Error;

/// Sensor collaborator failures. Always transient.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// Bus transaction failed (NACK, arbitration loss)
    #[error("Bus error reading {sensor}")]
    Bus {
        /// Sensor that failed
        sensor: &'static str,
    },

    /// Sensor did not answer within its bus timeout
    #[error("Timeout reading {sensor}")]
    Timeout {
        /// Sensor that failed
        sensor: &'static str,
    },

    /// Reading decoded to something that is not a number (NaN, infinity)
    #[error("Invalid data from {sensor}")]
    InvalidData {
        /// Sensor that failed
        sensor: &'static str,
    },
}

impl SensorError {
    /// Name of the sensor involved, for logs
    pub const fn sensor(&self) -> &'static str {
        match self {
            Self::Bus { sensor } | Self::Timeout { sensor } | Self::InvalidData { sensor } => {
                sensor
            }
        }
    }
}

/// Peripheral bring-up failure
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("Peripheral bring-up failed: {peripheral}")]
pub struct InitError {
    /// Peripheral that could not be configured
    pub peripheral: &'static str,
}

/// Transport refused to start an operation
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// Publish requested before the link is up
    #[error("Transport not connected")]
    NotConnected,

    /// Request queue full or client rejected the message
    #[error("Transport rejected the request")]
    Rejected,
}

/// Topic or payload did not fit in its fixed-capacity buffer
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PayloadError {
    /// Encoded text is longer than the buffer allows
    #[error("Encoded {what} exceeds {max} bytes")]
    TooLong {
        /// What was being encoded
        what: &'static str,
        /// Buffer capacity in bytes
        max: usize,
    },

    /// Discovery document could not be serialized
    #[error("Discovery document serialization failed")]
    Serialize,
}

/// Invalid node configuration
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Interval or timeout set to zero
    #[error("{field} must be greater than zero")]
    ZeroDuration {
        /// Offending field
        field: &'static str,
    },

    /// Threshold negative or not a number
    #[error("{field} must be finite and non-negative")]
    InvalidThreshold {
        /// Offending field
        field: &'static str,
    },

    /// Required text field left empty
    #[error("{field} must not be empty")]
    Empty {
        /// Offending field
        field: &'static str,
    },

    /// Topic derived from this field would not fit the topic buffer
    #[error("{field} makes a topic of {len} bytes, limit is {max}")]
    TopicTooLong {
        /// Offending field
        field: &'static str,
        /// Resulting topic length
        len: usize,
        /// Topic buffer capacity
        max: usize,
    },

    /// JSON document could not be parsed
    #[error("Malformed configuration at line {line}, column {column}")]
    Parse {
        /// 1-based line of the error
        line: usize,
        /// 1-based column of the error
        column: usize,
    },
}

/// Cycle could not complete and the device must restart
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CycleError {
    /// Cold-start peripheral bring-up failed
    #[error("Fatal: {0}")]
    Fatal(InitError),
}

impl From<InitError> for CycleError {
    fn from(err: InitError) -> Self {
        Self::Fatal(err)
    }
}
