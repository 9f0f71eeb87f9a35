//! Common test doubles for integration tests
//!
//! This module provides:
//! - A scripted transport that records every call and replays verdicts
//! - Scripted sensors and a recording platform
//! - A [`Node`] harness that simulates power cycles: retained state
//!   survives, the live interrupt latch does not

#![allow(dead_code, unused_imports)]

pub mod doubles;

use sensornode_core::{
    CycleController, CycleError, CycleReport, DeviceState, InterruptLatch, MemoryStore,
    NodeConfig, WakeCause,
    time::FixedTime,
};

pub use doubles::{Call, PowerDown, RecordingPlatform, Restarted, ScriptedSensors, ScriptedTransport};

/// A simulated device across several wake-ups
pub struct Node {
    pub config: NodeConfig,
    pub store: MemoryStore,
    pub transport: ScriptedTransport,
    pub sensors: ScriptedSensors,
    pub platform: RecordingPlatform,
    pub now: u64,
}

impl Node {
    /// Fresh device with default configuration and nothing retained
    pub fn new() -> Self {
        Self::with_config(NodeConfig::default())
    }

    pub fn with_config(config: NodeConfig) -> Self {
        Self {
            config,
            store: MemoryStore::new(),
            transport: ScriptedTransport::new(),
            sensors: ScriptedSensors::new(120, 20.0, 45.0),
            platform: RecordingPlatform::new(),
            now: 0,
        }
    }

    /// Wake with a new (empty) live latch, as after deep sleep
    pub fn wake(&mut self, cause: WakeCause) -> Result<CycleReport, CycleError> {
        let latch = InterruptLatch::new();
        self.run(cause, &latch)
    }

    /// Wake and let the motion handler fire with `level` before the cycle
    pub fn wake_after_edge(&mut self, cause: WakeCause, level: bool) -> Result<CycleReport, CycleError> {
        let latch = InterruptLatch::new();
        latch.on_edge(level);
        self.run(cause, &latch)
    }

    /// Run one cycle against `latch`
    pub fn run(&mut self, cause: WakeCause, latch: &InterruptLatch) -> Result<CycleReport, CycleError> {
        let mut controller = CycleController::new(
            self.config.clone(),
            &mut self.platform,
            &mut self.sensors,
            &mut self.transport,
            FixedTime::new(self.now),
            &mut self.store,
            latch,
        );
        controller.run(cause)
    }

    /// Move the clock forward by one sleep interval
    pub fn sleep(&mut self) {
        self.now += self.config.sleep_interval_ms;
    }

    /// Currently retained state
    pub fn retained(&self) -> DeviceState {
        *self.store.state()
    }
}
