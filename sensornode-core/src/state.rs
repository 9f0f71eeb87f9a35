//! Persistent State Across Deep Sleep
//!
//! ## Overview
//!
//! Deep sleep powers off everything except a small retention domain. The
//! few values that must survive are gathered into one [`DeviceState`]:
//!
//! ```text
//! DeviceState
//! ├── light:       MetricRecord<u16>  { last_value, valid, last_sent_at }
//! ├── temperature: MetricRecord<f32>
//! ├── humidity:    MetricRecord<f32>
//! └── motion:      LatchState         { level, pending }
//! ```
//!
//! The controller loads it once at the start of a cycle and stores it once
//! at the end. Nothing else touches the store; in particular the motion
//! interrupt handler writes to [`crate::latch::InterruptLatch`], never here.
//!
//! ## Backends
//!
//! - [`MemoryStore`]: an owned `DeviceState`. On hardware this is the value
//!   kept in RTC memory; on hosts it is what tests carry between simulated
//!   power cycles.
//! - [`FileStore`] (std): JSON file, for running the node logic as a
//!   process that is restarted every cycle.
//!
//! A store has no error path. Retention memory is always there, and the
//! file backend falls back to the first-boot default rather than refusing
//! to run.

use serde::{Deserialize, Serialize};

use crate::{latch::LatchState, time::Timestamp};

/// Last transmitted value of one metric
///
/// `valid` is false only between a reset and the first reading; once set it
/// stays set for the life of the device.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricRecord<T> {
    /// Value that was last transmitted (the hysteresis baseline)
    pub last_value: T,

    /// Baseline holds a real reading
    pub valid: bool,

    /// Cycle timestamp of the last transmission
    pub last_sent_at: Timestamp,
}

/// Everything that survives deep sleep
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DeviceState {
    /// Ambient light in lux
    pub light: MetricRecord<u16>,

    /// Temperature in the configured unit
    pub temperature: MetricRecord<f32>,

    /// Relative humidity in %
    pub humidity: MetricRecord<f32>,

    /// Last known motion level and whether it still has to be published
    pub motion: LatchState,
}

impl DeviceState {
    /// State after a factory reset: nothing valid, nothing pending
    pub fn first_boot() -> Self {
        Self::default()
    }

    /// Invalidate every metric baseline. The motion latch is kept so a
    /// level that was still pending gets published.
    pub fn clear_records(&mut self) {
        self.light = MetricRecord::default();
        self.temperature = MetricRecord::default();
        self.humidity = MetricRecord::default();
    }
}

/// Load/store access to the retained state
pub trait StateStore {
    /// Last stored state, or [`DeviceState::first_boot`] if there is none
    fn load(&mut self) -> DeviceState;

    /// Replace the retained state
    fn store(&mut self, state: &DeviceState);
}

impl<S: StateStore + ?Sized> StateStore for &mut S {
    fn load(&mut self) -> DeviceState {
        (**self).load()
    }

    fn store(&mut self, state: &DeviceState) {
        (**self).store(state)
    }
}

/// Retained state held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: DeviceState,
    writes: u32,
}

impl MemoryStore {
    /// Store holding the first-boot state
    pub fn new() -> Self {
        Self::default()
    }

    /// Store preloaded with `state`
    pub fn with_state(state: DeviceState) -> Self {
        Self { state, writes: 0 }
    }

    /// Currently retained state
    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    /// Number of `store` calls so far
    pub fn writes(&self) -> u32 {
        self.writes
    }
}

impl StateStore for MemoryStore {
    fn load(&mut self) -> DeviceState {
        self.state
    }

    fn store(&mut self, state: &DeviceState) {
        self.state = *state;
        self.writes += 1;
    }
}

#[cfg(feature = "std")]
pub use file::FileStore;

#[cfg(feature = "std")]
mod file {
    use std::{
        fs, io,
        path::{Path, PathBuf},
    };

    use super::{DeviceState, StateStore};

    /// Retained state kept in a JSON file
    ///
    /// Writes go to a sibling temp file that is then renamed over the
    /// target, so a crash mid-write leaves the previous state readable.
    #[derive(Debug, Clone)]
    pub struct FileStore {
        path: PathBuf,
    }

    impl FileStore {
        /// Store backed by the file at `path` (created on first `store`)
        pub fn new(path: impl Into<PathBuf>) -> Self {
            Self { path: path.into() }
        }

        /// Backing file path
        pub fn path(&self) -> &Path {
            &self.path
        }

        fn read(&self) -> io::Result<DeviceState> {
            let text = fs::read_to_string(&self.path)?;
            serde_json::from_str(&text).map_err(io::Error::from)
        }

        fn write(&self, state: &DeviceState) -> io::Result<()> {
            let text = serde_json::to_string_pretty(state).map_err(io::Error::from)?;
            let tmp = self.path.with_extension("tmp");
            fs::write(&tmp, text)?;
            fs::rename(&tmp, &self.path)
        }
    }

    impl StateStore for FileStore {
        fn load(&mut self) -> DeviceState {
            match self.read() {
                Ok(state) => state,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    node_info!("No retained state at {}, starting fresh", self.path.display());
                    DeviceState::first_boot()
                }
                Err(e) => {
                    node_warn!(
                        "Retained state at {} unreadable ({}), starting fresh",
                        self.path.display(),
                        e
                    );
                    DeviceState::first_boot()
                }
            }
        }

        fn store(&mut self, state: &DeviceState) {
            if let Err(e) = self.write(state) {
                node_warn!("Failed to retain state at {}: {}", self.path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_boot_has_nothing_valid() {
        let state = DeviceState::first_boot();
        assert!(!state.light.valid);
        assert!(!state.temperature.valid);
        assert!(!state.humidity.valid);
        assert!(!state.motion.pending);
    }

    #[test]
    fn clearing_records_keeps_pending_motion() {
        let mut state = DeviceState::first_boot();
        state.light = MetricRecord { last_value: 120, valid: true, last_sent_at: 5_000 };
        state.humidity = MetricRecord { last_value: 40.0, valid: true, last_sent_at: 5_000 };
        state.motion = LatchState { level: false, pending: true };

        state.clear_records();

        assert!(!state.light.valid);
        assert!(!state.temperature.valid);
        assert!(!state.humidity.valid);
        assert_eq!(state.motion, LatchState { level: false, pending: true });
    }

    #[test]
    fn memory_store_round_trips() {
        let mut store = MemoryStore::new();
        assert_eq!(store.load(), DeviceState::first_boot());

        let mut state = DeviceState::first_boot();
        state.light = MetricRecord { last_value: 120, valid: true, last_sent_at: 5_000 };
        store.store(&state);

        assert_eq!(store.load().light.last_value, 120);
        assert_eq!(store.writes(), 1);
    }

    #[test]
    fn borrowed_store_writes_through() {
        fn latch_motion<S: StateStore>(mut store: S) {
            let mut state = store.load();
            state.motion = LatchState { level: true, pending: true };
            store.store(&state);
        }

        let mut store = MemoryStore::new();
        latch_motion(&mut store);
        assert!(store.state().motion.pending);
    }

    #[cfg(feature = "std")]
    mod file_store {
        use super::*;

        #[test]
        fn missing_file_loads_first_boot() {
            let dir = tempfile::tempdir().unwrap();
            let mut store = FileStore::new(dir.path().join("state.json"));
            assert_eq!(store.load(), DeviceState::first_boot());
        }

        #[test]
        fn persists_across_instances() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("state.json");

            let mut state = DeviceState::first_boot();
            state.temperature = MetricRecord { last_value: 20.5, valid: true, last_sent_at: 42 };
            state.motion = LatchState { level: true, pending: true };
            FileStore::new(&path).store(&state);

            // New instance models a fresh boot reading retained memory
            let mut reopened = FileStore::new(&path);
            assert_eq!(reopened.load(), state);
        }

        #[test]
        fn corrupt_file_loads_first_boot() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("state.json");
            std::fs::write(&path, "{ not json").unwrap();

            let mut store = FileStore::new(&path);
            assert_eq!(store.load(), DeviceState::first_boot());
        }
    }
}
