//! Scripted collaborators
//!
//! Each double records what the core asked of it so tests can assert on
//! the exact call sequence, and replays verdicts queued by the test.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use sensornode_core::{
    Completion, InitError, Platform, SensorError, SleepRequest, Ticket, Transport, TransportError,
    controller::Sensors,
};

/// One call made against [`ScriptedTransport`]
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Connect,
    Publish { topic: String, payload: String },
    Wait { timeout: Duration },
}

/// Transport that replays queued verdicts.
///
/// Unscripted connects and publishes are acknowledged.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    pub calls: Vec<Call>,
    connect: VecDeque<Result<Completion, TransportError>>,
    publish: VecDeque<Completion>,
    in_flight: HashMap<u32, Completion>,
    next_ticket: u32,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Verdict for the next connect
    pub fn on_connect(&mut self, verdict: Completion) -> &mut Self {
        self.connect.push_back(Ok(verdict));
        self
    }

    /// Next connect is refused outright
    pub fn refuse_connect(&mut self, err: TransportError) -> &mut Self {
        self.connect.push_back(Err(err));
        self
    }

    /// Verdicts for the next publishes, in order
    pub fn on_publish(&mut self, verdicts: &[Completion]) -> &mut Self {
        self.publish.extend(verdicts.iter().copied());
        self
    }

    pub fn connects(&self) -> usize {
        self.calls.iter().filter(|c| **c == Call::Connect).count()
    }

    /// `(topic, payload)` of every publish, in order
    pub fn published(&self) -> Vec<(&str, &str)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Publish { topic, payload } => Some((topic.as_str(), payload.as_str())),
                _ => None,
            })
            .collect()
    }

    pub fn published_topics(&self) -> Vec<&str> {
        self.published().into_iter().map(|(t, _)| t).collect()
    }

    pub fn waits(&self) -> Vec<Duration> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Wait { timeout } => Some(*timeout),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }

    fn issue(&mut self, verdict: Completion) -> Ticket {
        // Start at 0: a zero handle is a valid in-flight operation
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        self.in_flight.insert(ticket.0, verdict);
        ticket
    }
}

impl Transport for ScriptedTransport {
    fn connect(&mut self) -> Result<Ticket, TransportError> {
        self.calls.push(Call::Connect);
        let verdict = self.connect.pop_front().unwrap_or(Ok(Completion::Acked))?;
        Ok(self.issue(verdict))
    }

    fn publish(&mut self, topic: &str, payload: &str) -> Result<Ticket, TransportError> {
        self.calls.push(Call::Publish {
            topic: topic.to_string(),
            payload: payload.to_string(),
        });
        let verdict = self.publish.pop_front().unwrap_or(Completion::Acked);
        Ok(self.issue(verdict))
    }

    fn wait(&mut self, ticket: Ticket, timeout: Duration) -> Completion {
        self.calls.push(Call::Wait { timeout });
        self.in_flight.remove(&ticket.0).unwrap_or(Completion::Error)
    }
}

/// Sensors returning fixed readings until changed
#[derive(Debug, Clone)]
pub struct ScriptedSensors {
    pub light: Result<u16, SensorError>,
    pub climate: Result<(f32, f32), SensorError>,
    pub reads: u32,
}

impl ScriptedSensors {
    pub fn new(light: u16, temperature: f32, humidity: f32) -> Self {
        Self {
            light: Ok(light),
            climate: Ok((temperature, humidity)),
            reads: 0,
        }
    }

    pub fn set(&mut self, light: u16, temperature: f32, humidity: f32) {
        self.light = Ok(light);
        self.climate = Ok((temperature, humidity));
    }
}

impl Sensors for ScriptedSensors {
    fn read_light(&mut self) -> Result<u16, SensorError> {
        self.reads += 1;
        self.light
    }

    fn read_temperature_humidity(&mut self) -> Result<(f32, f32), SensorError> {
        self.reads += 1;
        self.climate
    }
}

/// Panic payload raised by [`RecordingPlatform::power_down`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerDown(pub SleepRequest);

/// Panic payload raised by [`RecordingPlatform::restart`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Restarted;

/// Board double. Power-down and restart unwind with a typed payload so a
/// test can catch the terminal action.
#[derive(Debug, Clone)]
pub struct RecordingPlatform {
    pub init: Result<(), InitError>,
    pub sensors_ready: Result<(), InitError>,
    pub pin_ready: Result<(), InitError>,
    pub level: bool,
    pub inits: u32,
}

impl RecordingPlatform {
    pub fn new() -> Self {
        Self {
            init: Ok(()),
            sensors_ready: Ok(()),
            pin_ready: Ok(()),
            level: false,
            inits: 0,
        }
    }
}

impl Platform for RecordingPlatform {
    fn init_peripherals(&mut self) -> Result<(), InitError> {
        self.inits += 1;
        self.init
    }

    fn prepare_sensors(&mut self) -> Result<(), InitError> {
        self.sensors_ready
    }

    fn prepare_interrupt_pin(&mut self) -> Result<(), InitError> {
        self.pin_ready
    }

    fn read_interrupt_level(&mut self) -> bool {
        self.level
    }

    fn power_down(&mut self, request: &SleepRequest) -> ! {
        std::panic::panic_any(PowerDown(*request))
    }

    fn restart(&mut self) -> ! {
        std::panic::panic_any(Restarted)
    }
}
