//! Default Values for the Sensor Node
//!
//! Every number the node ships with is defined here, with its unit in the
//! name. [`crate::config::NodeConfig::default`] is built from these, and a
//! deployment overrides them through the configuration rather than by
//! editing code.
//!
//! The defaults target a mains-free indoor node with an ambient light
//! sensor, a temperature/humidity sensor and a PIR motion sensor, reporting
//! to an MQTT broker with Home Assistant discovery.

// ===== TIME UNIT CONVERSIONS =====

/// Milliseconds per second.
pub const MS_PER_SECOND: u64 = 1000;

// ===== WAKE SCHEDULE =====

/// Time between timer wake-ups (milliseconds).
///
/// Short enough that a change in light or temperature is noticed quickly,
/// long enough that the radio stays off for most cycles.
pub const SLEEP_INTERVAL_MS: u64 = 5 * MS_PER_SECOND;

/// Maximum time without transmitting a metric (milliseconds).
///
/// A metric that has not crossed its threshold is republished once this
/// much time has passed since it was last sent, so consumers can tell a
/// quiet node from a dead one.
pub const MAX_STALENESS_INTERVAL_MS: u64 = 300 * MS_PER_SECOND;

// ===== CHANGE THRESHOLDS =====

/// Light change that triggers a publish (lux, exclusive).
pub const LIGHT_THRESHOLD_LUX: u16 = 2;

/// Temperature change that triggers a publish (degrees, exclusive).
///
/// Applied in whichever unit the node reports in.
pub const TEMPERATURE_THRESHOLD: f32 = 0.2;

/// Relative humidity change that triggers a publish (%RH, exclusive).
pub const HUMIDITY_THRESHOLD_PCT: f32 = 2.0;

// ===== NETWORK TIMEOUTS =====

/// Upper bound on waiting for the link to come up (milliseconds).
pub const CONNECT_TIMEOUT_MS: u64 = 500;

/// Upper bound on waiting for a single publish acknowledgement (milliseconds).
pub const PUBLISH_TIMEOUT_MS: u64 = 200;

// ===== NAMING =====

/// Node name, used as the root of every state topic.
pub const DEFAULT_NODE_NAME: &str = "ESP32-SensorNode";

/// Light state topic suffix.
pub const LIGHT_TOPIC: &str = "light";

/// Temperature state topic suffix.
pub const TEMPERATURE_TOPIC: &str = "temperature";

/// Humidity state topic suffix.
pub const HUMIDITY_TOPIC: &str = "humidity";

/// Motion state topic suffix.
pub const MOTION_TOPIC: &str = "motion";

/// Discovery prefix for numeric sensors (Home Assistant convention).
pub const SENSOR_DISCOVERY_PREFIX: &str = "homeassistant/sensor";

/// Discovery prefix for binary sensors (Home Assistant convention).
pub const BINARY_SENSOR_DISCOVERY_PREFIX: &str = "homeassistant/binary_sensor";

// ===== BUFFER SIZES =====

/// Longest topic the node will build (bytes).
pub const TOPIC_MAX_LEN: usize = 80;

/// Longest discovery document the node will publish (bytes).
pub const DISCOVERY_PAYLOAD_MAX_LEN: usize = 200;

/// Longest measurement payload (bytes).
///
/// Fits `"-40.00"` through `"65535"` with room to spare.
pub const MEASUREMENT_MAX_LEN: usize = 10;

/// Items a single publish run can carry: light, temperature, humidity, motion.
pub const MAX_PUBLISH_ITEMS: usize = 4;

// ===== UNIT CONVERSION =====

/// Fahrenheit degrees per Celsius degree.
pub const FAHRENHEIT_SCALE: f32 = 1.8;

/// Fahrenheit value at 0 °C.
pub const FAHRENHEIT_OFFSET: f32 = 32.0;
