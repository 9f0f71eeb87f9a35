//! Wake Dispatcher and Cycle Controller
//!
//! ## Overview
//!
//! One [`CycleController::run`] call is one wake-up. The platform reports
//! why the device woke and the controller picks a path:
//!
//! ```text
//!            ┌──────────────┐
//! ColdStart ─┤ clear records├─ init peripherals (fatal on error) ─ announce ─┐
//! (or Other) └──────────────┘                                                │
//!            ┌──────────────┐                                                │
//! Timer ─────┤ read sensors ├─ change detection ─ publish dirty ─ commit ────┤
//!            └──────────────┘                                                │
//!            ┌──────────────┐                                                │
//! Interrupt ─┤ arm pin      ├─ sample level unless already pending ──────────┤
//!            └──────────────┘                                                │
//!                                                                            ▼
//!                             pending motion? ─ publish level ─ ack clears pending
//!                                                                            │
//!                                                                            ▼
//!                                   store state ─ schedule next wake ─ power down
//! ```
//!
//! ## Cycle timestamp
//!
//! The clock is read exactly once, before anything else. Every staleness
//! decision in the cycle compares against that one value.
//!
//! ## Failure policy
//!
//! | Failure                         | Effect                                   |
//! |---------------------------------|------------------------------------------|
//! | Peripheral bring-up (cold)      | [`CycleError::Fatal`], device restarts   |
//! | Sensor prep or read             | Metric skipped, retried next timer wake  |
//! | Connect failed / timed out      | Nothing committed, retried next wake     |
//! | Publish error / timeout         | That item not committed                  |
//! | Motion publish not acked        | `pending` stays set, retried next wake   |
//!
//! Everything except the first row still ends in a normal sleep.

use heapless::Vec;

use crate::{
    config::NodeConfig,
    detection::{ChangeDetector, Metric},
    errors::{CycleError, InitError, SensorError},
    items::{Item, ItemKind, PublishSet},
    latch::InterruptLatch,
    orchestrator::{Orchestrator, Outcome},
    sleep::{SleepRequest, SleepScheduler},
    state::{DeviceState, MetricRecord, StateStore},
    time::{TimeSource, Timestamp},
    transport::Transport,
};

/// Platform-reported reason for resuming from deep sleep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakeCause {
    /// Power-on or reset
    ColdStart,
    /// Sleep timer expired
    Timer,
    /// Motion pin changed level
    Interrupt,
    /// Anything else the platform reports
    Other,
}

impl WakeCause {
    /// Path taken for this cause. Unrecognized causes start cold.
    pub const fn path(&self) -> CyclePath {
        match self {
            Self::Timer => CyclePath::Timer,
            Self::Interrupt => CyclePath::Interrupt,
            Self::ColdStart | Self::Other => CyclePath::ColdStart,
        }
    }
}

/// Path a cycle took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CyclePath {
    /// Records reset, peripherals brought up, discovery announced
    ColdStart,
    /// Periodic measurement
    Timer,
    /// Motion edge handling
    Interrupt,
}

impl CyclePath {
    /// Short label for logs
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ColdStart => "cold start",
            Self::Timer => "timer",
            Self::Interrupt => "interrupt",
        }
    }
}

/// Sensor collaborators. Each read is one blocking call with its own bus
/// timeout.
pub trait Sensors {
    /// Ambient light in lux
    fn read_light(&mut self) -> Result<u16, SensorError>;

    /// Temperature in °C and relative humidity in %
    fn read_temperature_humidity(&mut self) -> Result<(f32, f32), SensorError>;
}

impl<S: Sensors + ?Sized> Sensors for &mut S {
    fn read_light(&mut self) -> Result<u16, SensorError> {
        (**self).read_light()
    }

    fn read_temperature_humidity(&mut self) -> Result<(f32, f32), SensorError> {
        (**self).read_temperature_humidity()
    }
}

/// Board services outside the sensors and the network
pub trait Platform {
    /// Bring up buses and sensors after power-on
    fn init_peripherals(&mut self) -> Result<(), InitError>;

    /// Re-arm the sensor bus after a timer wake
    fn prepare_sensors(&mut self) -> Result<(), InitError>;

    /// Re-arm the motion pin after an interrupt wake
    fn prepare_interrupt_pin(&mut self) -> Result<(), InitError>;

    /// Current level of the motion pin
    fn read_interrupt_level(&mut self) -> bool;

    /// Arm the wake sources and enter deep sleep
    fn power_down(&mut self, request: &SleepRequest) -> !;

    /// Reset the device
    fn restart(&mut self) -> !;
}

impl<P: Platform + ?Sized> Platform for &mut P {
    fn init_peripherals(&mut self) -> Result<(), InitError> {
        (**self).init_peripherals()
    }

    fn prepare_sensors(&mut self) -> Result<(), InitError> {
        (**self).prepare_sensors()
    }

    fn prepare_interrupt_pin(&mut self) -> Result<(), InitError> {
        (**self).prepare_interrupt_pin()
    }

    fn read_interrupt_level(&mut self) -> bool {
        (**self).read_interrupt_level()
    }

    fn power_down(&mut self, request: &SleepRequest) -> ! {
        (**self).power_down(request)
    }

    fn restart(&mut self) -> ! {
        (**self).restart()
    }
}

/// What happened to the latched motion level this cycle
#[derive(Debug, Clone, PartialEq)]
pub enum MotionOutcome {
    /// Nothing was pending
    Idle,
    /// Level published and acknowledged, `pending` cleared
    Cleared {
        /// Level that was published
        level: bool,
    },
    /// Level acknowledged but a newer edge arrived meanwhile; still pending
    Superseded,
    /// Not acknowledged; still pending for the next wake
    Retained(Outcome),
}

impl MotionOutcome {
    /// Whether a level is still waiting to be published
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Superseded | Self::Retained(_))
    }
}

/// What one cycle did
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Path taken
    pub path: CyclePath,
    /// Cycle timestamp
    pub now: Timestamp,
    /// Discovery or measurement publish
    pub outcome: Outcome,
    /// Motion publish
    pub motion: MotionOutcome,
    /// Metrics whose new baseline was stored
    pub committed: Vec<ItemKind, 3>,
    /// Wake sources for the following sleep
    pub sleep: SleepRequest,
}

/// Runs wake cycles against the board, sensors, network and retained state
pub struct CycleController<'l, P, S, T, C, St> {
    config: NodeConfig,
    platform: P,
    sensors: S,
    transport: T,
    clock: C,
    store: St,
    latch: &'l InterruptLatch,
}

impl<'l, P, S, T, C, St> CycleController<'l, P, S, T, C, St>
where
    P: Platform,
    S: Sensors,
    T: Transport,
    C: TimeSource,
    St: StateStore,
{
    /// Controller for one boot. `latch` is the cell the motion interrupt
    /// handler writes through [`InterruptLatch::on_edge`].
    pub fn new(
        config: NodeConfig,
        platform: P,
        sensors: S,
        transport: T,
        clock: C,
        store: St,
        latch: &'l InterruptLatch,
    ) -> Self {
        Self {
            config,
            platform,
            sensors,
            transport,
            clock,
            store,
            latch,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Board services
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Network transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Retained state store
    pub fn store(&self) -> &St {
        &self.store
    }

    /// Run one wake cycle and return what it did without powering down.
    pub fn run(&mut self, cause: WakeCause) -> Result<CycleReport, CycleError> {
        let Self {
            config,
            platform,
            sensors,
            transport,
            clock,
            store,
            latch,
        } = self;
        let latch: &InterruptLatch = *latch;

        let now = clock.now();
        let path = cause.path();
        node_info!("Wake: {} at {} ms", path.as_str(), now);

        let mut state = store.load();
        latch.adopt(state.motion);

        let mut orchestrator = Orchestrator::new(config);
        let mut committed = Vec::new();

        let outcome = match path {
            CyclePath::ColdStart => {
                state.clear_records();
                node_info!("Cold start, sensornode-core {}", crate::VERSION);

                if let Err(e) = platform.init_peripherals() {
                    node_error!("Peripheral bring-up failed: {}", e.peripheral);
                    return Err(e.into());
                }

                if config.discovery.enabled {
                    orchestrator.run(&PublishSet::discovery(), transport)
                } else {
                    Outcome::NothingToDo
                }
            }
            CyclePath::Timer => {
                let staged = match platform.prepare_sensors() {
                    Ok(()) => measure(config, sensors, &state, now),
                    Err(e) => {
                        node_warn!("Sensor prep failed: {}", e.peripheral);
                        Staged::default()
                    }
                };

                let outcome = orchestrator.run(&staged.items, transport);
                commit(&mut state.light, staged.light, ItemKind::Light, &outcome, &mut committed);
                commit(
                    &mut state.temperature,
                    staged.temperature,
                    ItemKind::Temperature,
                    &outcome,
                    &mut committed,
                );
                commit(&mut state.humidity, staged.humidity, ItemKind::Humidity, &outcome, &mut committed);
                outcome
            }
            CyclePath::Interrupt => {
                if let Err(e) = platform.prepare_interrupt_pin() {
                    node_warn!("Motion pin prep failed: {}", e.peripheral);
                } else if !latch.snapshot().pending {
                    let sampled = latch.sample(platform.read_interrupt_level());
                    node_debug!("Sampled motion level {}", sampled.level);
                }
                Outcome::NothingToDo
            }
        };
        node_info!("Publish: {}, {} committed", outcome.as_str(), committed.len());

        let motion = publish_motion(latch, &mut orchestrator, transport);

        state.motion = latch.snapshot();
        store.store(&state);

        let sleep = SleepScheduler::new(config.sleep_interval()).schedule_next(state.motion);

        Ok(CycleReport {
            path,
            now,
            outcome,
            motion,
            committed,
            sleep,
        })
    }

    /// Platform entry point: run the cycle, then sleep, or restart if the
    /// cycle hit a fatal error.
    pub fn on_wake(mut self, cause: WakeCause) -> ! {
        match self.run(cause) {
            Ok(_) => SleepScheduler::new(self.config.sleep_interval()).enter(self.latch, &mut self.platform),
            Err(CycleError::Fatal(e)) => {
                node_error!("Restarting after fatal error: {}", e.peripheral);
                self.platform.restart()
            }
        }
    }
}

/// Dirty readings and the records to store once they are acknowledged
#[derive(Debug, Default)]
struct Staged {
    items: PublishSet,
    light: Option<MetricRecord<u16>>,
    temperature: Option<MetricRecord<f32>>,
    humidity: Option<MetricRecord<f32>>,
}

fn measure<S: Sensors>(config: &NodeConfig, sensors: &mut S, state: &DeviceState, now: Timestamp) -> Staged {
    let mut staged = Staged::default();

    match sensors.read_light() {
        Ok(lux) => {
            let detector = ChangeDetector::new(config.light_threshold, config.max_staleness_ms);
            if let Some(record) = stage(&detector, lux, &state.light, now, ItemKind::Light) {
                staged.items.insert(Item::Light(lux));
                staged.light = Some(record);
            }
        }
        Err(e) => node_warn!("Light skipped: {} read failed", e.sensor()),
    }

    match sensors.read_temperature_humidity() {
        Ok((celsius, humidity)) => {
            let temperature = config.temperature_unit.from_celsius(celsius);

            let detector = ChangeDetector::new(config.temperature_threshold, config.max_staleness_ms);
            if let Some(record) = stage(&detector, temperature, &state.temperature, now, ItemKind::Temperature) {
                staged.items.insert(Item::Temperature(temperature));
                staged.temperature = Some(record);
            }

            let detector = ChangeDetector::new(config.humidity_threshold, config.max_staleness_ms);
            if let Some(record) = stage(&detector, humidity, &state.humidity, now, ItemKind::Humidity) {
                staged.items.insert(Item::Humidity(humidity));
                staged.humidity = Some(record);
            }
        }
        Err(e) => node_warn!("Climate skipped: {} read failed", e.sensor()),
    }

    node_info!("Dirty: {} of 3", staged.items.len());
    staged
}

/// New record for a dirty reading, `None` if quiet or unusable
fn stage<T: Metric>(
    detector: &ChangeDetector<T>,
    value: T,
    record: &MetricRecord<T>,
    now: Timestamp,
    kind: ItemKind,
) -> Option<MetricRecord<T>> {
    if !value.is_valid() {
        node_warn!("Discarding invalid {} reading", kind.name());
        return None;
    }

    let eval = detector.evaluate(value, record, now);
    node_debug!("{} dirty: {}", kind.name(), eval.dirty);
    eval.dirty.then_some(eval.record)
}

fn commit<T>(
    record: &mut MetricRecord<T>,
    staged: Option<MetricRecord<T>>,
    kind: ItemKind,
    outcome: &Outcome,
    committed: &mut Vec<ItemKind, 3>,
) {
    if let Some(new) = staged {
        if outcome.is_acked(kind) {
            *record = new;
            let _ = committed.push(kind);
        }
    }
}

/// Publish the latched motion level if it is still pending
fn publish_motion<T: Transport>(
    latch: &InterruptLatch,
    orchestrator: &mut Orchestrator<'_>,
    transport: &mut T,
) -> MotionOutcome {
    let snapshot = latch.snapshot();
    if !snapshot.pending {
        return MotionOutcome::Idle;
    }

    let mut items = PublishSet::new();
    items.insert(Item::Motion(snapshot.level));
    let outcome = orchestrator.run(&items, transport);

    if !outcome.is_acked(ItemKind::Motion) {
        node_warn!("Motion publish: {}, staying pending", outcome.as_str());
        return MotionOutcome::Retained(outcome);
    }

    if latch.acknowledge(snapshot.level) {
        MotionOutcome::Cleared { level: snapshot.level }
    } else {
        node_info!("Motion changed during publish, staying pending");
        MotionOutcome::Superseded
    }
}
