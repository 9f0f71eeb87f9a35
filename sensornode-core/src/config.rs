//! Node configuration
//!
//! One [`NodeConfig`] drives the whole cycle: wake interval, per-metric
//! thresholds, network timeouts and topic naming. Defaults come from
//! [`crate::constants`]; deployments override them with the `with_*`
//! builders or, on hosts, from a JSON document.
//!
//! ```rust
//! use sensornode_core::config::{NodeConfig, TemperatureUnit};
//!
//! let config = NodeConfig::default()
//!     .with_node_name("greenhouse-east")
//!     .with_temperature_unit(TemperatureUnit::Fahrenheit)
//!     .with_sleep_interval_ms(60_000);
//!
//! assert!(config.validate().is_ok());
//! ```

use alloc::string::{String, ToString};
use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    constants::*,
    errors::ConfigError,
    items::ItemKind,
};

/// Unit the node reports temperature in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TemperatureUnit {
    /// Degrees Celsius
    #[default]
    Celsius,
    /// Degrees Fahrenheit
    Fahrenheit,
}

impl TemperatureUnit {
    /// Convert a Celsius reading into this unit
    pub fn from_celsius(&self, celsius: f32) -> f32 {
        match self {
            Self::Celsius => celsius,
            Self::Fahrenheit => celsius * FAHRENHEIT_SCALE + FAHRENHEIT_OFFSET,
        }
    }

    /// Unit of measurement as shown to consumers
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Celsius => "°C",
            Self::Fahrenheit => "°F",
        }
    }
}

/// State topic suffix for each sensor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicNames {
    /// Light topic suffix
    pub light: String,
    /// Temperature topic suffix
    pub temperature: String,
    /// Humidity topic suffix
    pub humidity: String,
    /// Motion topic suffix
    pub motion: String,
}

impl Default for TopicNames {
    fn default() -> Self {
        Self {
            light: LIGHT_TOPIC.to_string(),
            temperature: TEMPERATURE_TOPIC.to_string(),
            humidity: HUMIDITY_TOPIC.to_string(),
            motion: MOTION_TOPIC.to_string(),
        }
    }
}

impl TopicNames {
    /// Suffix for `kind`
    pub fn get(&self, kind: ItemKind) -> &str {
        match kind {
            ItemKind::Light => &self.light,
            ItemKind::Temperature => &self.temperature,
            ItemKind::Humidity => &self.humidity,
            ItemKind::Motion => &self.motion,
        }
    }
}

/// Discovery announcement settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Announce sensors on cold start
    pub enabled: bool,
    /// Prefix for numeric sensors
    pub sensor_prefix: String,
    /// Prefix for binary sensors (motion)
    pub binary_sensor_prefix: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sensor_prefix: SENSOR_DISCOVERY_PREFIX.to_string(),
            binary_sensor_prefix: BINARY_SENSOR_DISCOVERY_PREFIX.to_string(),
        }
    }
}

impl DiscoveryConfig {
    /// Prefix used when announcing `kind`
    pub fn prefix(&self, kind: ItemKind) -> &str {
        match kind {
            ItemKind::Motion => &self.binary_sensor_prefix,
            _ => &self.sensor_prefix,
        }
    }
}

/// Complete node configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Root of every state topic
    pub node_name: String,

    /// Time between timer wake-ups
    pub sleep_interval_ms: u64,

    /// Force a republish after this long without sending
    pub max_staleness_ms: u64,

    /// Light change threshold (lux, exclusive)
    pub light_threshold: u16,

    /// Temperature change threshold (configured unit, exclusive)
    pub temperature_threshold: f32,

    /// Humidity change threshold (%RH, exclusive)
    pub humidity_threshold: f32,

    /// Unit for temperature readings and thresholds
    pub temperature_unit: TemperatureUnit,

    /// Bound on waiting for the link
    pub connect_timeout_ms: u64,

    /// Bound on waiting for each publish acknowledgement
    pub publish_timeout_ms: u64,

    /// State topic suffixes
    pub topics: TopicNames,

    /// Discovery settings
    pub discovery: DiscoveryConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_name: DEFAULT_NODE_NAME.to_string(),
            sleep_interval_ms: SLEEP_INTERVAL_MS,
            max_staleness_ms: MAX_STALENESS_INTERVAL_MS,
            light_threshold: LIGHT_THRESHOLD_LUX,
            temperature_threshold: TEMPERATURE_THRESHOLD,
            humidity_threshold: HUMIDITY_THRESHOLD_PCT,
            temperature_unit: TemperatureUnit::Celsius,
            connect_timeout_ms: CONNECT_TIMEOUT_MS,
            publish_timeout_ms: PUBLISH_TIMEOUT_MS,
            topics: TopicNames::default(),
            discovery: DiscoveryConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Parse a JSON document. Missing fields keep their defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(|e| ConfigError::Parse {
            line: e.line(),
            column: e.column(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Set the node name
    pub fn with_node_name(mut self, name: &str) -> Self {
        self.node_name = name.to_string();
        self
    }

    /// Set the timer wake interval
    pub fn with_sleep_interval_ms(mut self, ms: u64) -> Self {
        self.sleep_interval_ms = ms;
        self
    }

    /// Set the staleness interval
    pub fn with_max_staleness_ms(mut self, ms: u64) -> Self {
        self.max_staleness_ms = ms;
        self
    }

    /// Set all three change thresholds
    pub fn with_thresholds(mut self, light: u16, temperature: f32, humidity: f32) -> Self {
        self.light_threshold = light;
        self.temperature_threshold = temperature;
        self.humidity_threshold = humidity;
        self
    }

    /// Set the temperature unit
    pub fn with_temperature_unit(mut self, unit: TemperatureUnit) -> Self {
        self.temperature_unit = unit;
        self
    }

    /// Set both network timeouts
    pub fn with_timeouts_ms(mut self, connect: u64, publish: u64) -> Self {
        self.connect_timeout_ms = connect;
        self.publish_timeout_ms = publish;
        self
    }

    /// Turn discovery announcements on or off
    pub fn with_discovery(mut self, enabled: bool) -> Self {
        self.discovery.enabled = enabled;
        self
    }

    /// Timer wake interval
    pub fn sleep_interval(&self) -> Duration {
        Duration::from_millis(self.sleep_interval_ms)
    }

    /// Link bring-up bound
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Per-publish acknowledgement bound
    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }

    /// Check every field, including that all derived topics fit their buffer
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("sleep_interval_ms", self.sleep_interval_ms),
            ("max_staleness_ms", self.max_staleness_ms),
            ("connect_timeout_ms", self.connect_timeout_ms),
            ("publish_timeout_ms", self.publish_timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroDuration { field });
            }
        }

        for (field, value) in [
            ("temperature_threshold", self.temperature_threshold),
            ("humidity_threshold", self.humidity_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidThreshold { field });
            }
        }

        if self.node_name.is_empty() {
            return Err(ConfigError::Empty { field: "node_name" });
        }

        for kind in ItemKind::ALL {
            let suffix = self.topics.get(kind);
            if suffix.is_empty() {
                return Err(ConfigError::Empty { field: kind.name() });
            }

            // {node}/{suffix}
            let state_len = self.node_name.len() + 1 + suffix.len();
            check_topic_len("topics", state_len)?;

            if self.discovery.enabled {
                // {prefix}/{node}/{suffix}/config
                let prefix = self.discovery.prefix(kind);
                let len = prefix.len() + 1 + self.node_name.len() + 1 + suffix.len() + "/config".len();
                check_topic_len("discovery", len)?;
            }
        }

        Ok(())
    }
}

fn check_topic_len(field: &'static str, len: usize) -> Result<(), ConfigError> {
    if len > TOPIC_MAX_LEN {
        return Err(ConfigError::TopicTooLong {
            field,
            len,
            max: TOPIC_MAX_LEN,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = NodeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sleep_interval(), Duration::from_secs(5));
        assert_eq!(config.max_staleness_ms, 300_000);
        assert_eq!(config.connect_timeout(), Duration::from_millis(500));
        assert_eq!(config.publish_timeout(), Duration::from_millis(200));
    }

    #[test]
    fn zero_interval_rejected() {
        let config = NodeConfig::default().with_sleep_interval_ms(0);
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroDuration { field: "sleep_interval_ms" })
        );
    }

    #[test]
    fn negative_threshold_rejected() {
        let config = NodeConfig::default().with_thresholds(2, -0.1, 2.0);
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidThreshold { field: "temperature_threshold" })
        );
    }

    #[test]
    fn long_node_name_rejected() {
        let name = "n".repeat(60);
        let config = NodeConfig::default().with_node_name(&name);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TopicTooLong { field: "discovery", .. })
        ));

        // Without discovery only the state topic has to fit
        assert!(config.with_discovery(false).validate().is_ok());
    }

    #[test]
    fn fahrenheit_conversion() {
        let unit = TemperatureUnit::Fahrenheit;
        assert!((unit.from_celsius(20.0) - 68.0).abs() < 1e-4);
        assert_eq!(unit.symbol(), "°F");
        assert_eq!(TemperatureUnit::Celsius.from_celsius(20.0), 20.0);
    }

    #[test]
    fn json_overrides_and_defaults() {
        let config = NodeConfig::from_json(
            r#"{
                "node_name": "attic",
                "temperature_unit": "fahrenheit",
                "discovery": { "enabled": false }
            }"#,
        )
        .unwrap();

        assert_eq!(config.node_name, "attic");
        assert_eq!(config.temperature_unit, TemperatureUnit::Fahrenheit);
        assert!(!config.discovery.enabled);
        assert_eq!(config.discovery.sensor_prefix, SENSOR_DISCOVERY_PREFIX);
        assert_eq!(config.light_threshold, LIGHT_THRESHOLD_LUX);
    }

    #[test]
    fn malformed_json_reports_position() {
        let err = NodeConfig::from_json("{\n  \"node_name\": }").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { line: 2, .. }));
    }
}
