//! Discovery announcements
//!
//! On cold start the node tells the home-automation side which sensors it
//! carries, one retained-style configuration document per sensor:
//!
//! ```json
//! {"device_class":"temperature","name":"ESP32-SensorNode-temperature",
//!  "state_topic":"ESP32-SensorNode/temperature","unit_of_measurement":"°C"}
//! ```
//!
//! Motion is a binary sensor and carries no unit.

use alloc::{format, string::String};

use serde::Serialize;

use crate::{
    config::NodeConfig,
    constants::DISCOVERY_PAYLOAD_MAX_LEN,
    errors::PayloadError,
    items::ItemKind,
    payload::{self, Topic},
};

#[derive(Debug, Serialize)]
struct Document<'a> {
    device_class: &'static str,
    name: &'a str,
    state_topic: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit_of_measurement: Option<&'static str>,
}

/// Topic and document announcing one sensor
#[derive(Debug, Clone, PartialEq)]
pub struct Announcement {
    /// Where the document is published
    pub topic: Topic,
    /// JSON configuration document
    pub payload: String,
}

/// Device class understood by the consumer
pub const fn device_class(kind: ItemKind) -> &'static str {
    match kind {
        ItemKind::Light => "illuminance",
        ItemKind::Temperature => "temperature",
        ItemKind::Humidity => "humidity",
        ItemKind::Motion => "motion",
    }
}

fn unit(config: &NodeConfig, kind: ItemKind) -> Option<&'static str> {
    match kind {
        ItemKind::Light => Some("lx"),
        ItemKind::Temperature => Some(config.temperature_unit.symbol()),
        ItemKind::Humidity => Some("%"),
        ItemKind::Motion => None,
    }
}

/// Build the announcement for `kind`
pub fn announcement(config: &NodeConfig, kind: ItemKind) -> Result<Announcement, PayloadError> {
    let topic = payload::discovery_topic(config, kind)?;
    let state_topic = payload::state_topic(config, kind)?;
    let name = format!("{}-{}", config.node_name, config.topics.get(kind));

    let document = Document {
        device_class: device_class(kind),
        name: &name,
        state_topic: &state_topic,
        unit_of_measurement: unit(config, kind),
    };

    let payload = serde_json::to_string(&document).map_err(|_| PayloadError::Serialize)?;
    if payload.len() > DISCOVERY_PAYLOAD_MAX_LEN {
        return Err(PayloadError::TooLong {
            what: "discovery document",
            max: DISCOVERY_PAYLOAD_MAX_LEN,
        });
    }

    Ok(Announcement { topic, payload })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TemperatureUnit;

    #[test]
    fn temperature_document() {
        let config = NodeConfig::default();
        let ann = announcement(&config, ItemKind::Temperature).unwrap();

        assert_eq!(
            ann.topic.as_str(),
            "homeassistant/sensor/ESP32-SensorNode/temperature/config"
        );

        let doc: serde_json::Value = serde_json::from_str(&ann.payload).unwrap();
        assert_eq!(doc["device_class"], "temperature");
        assert_eq!(doc["name"], "ESP32-SensorNode-temperature");
        assert_eq!(doc["state_topic"], "ESP32-SensorNode/temperature");
        assert_eq!(doc["unit_of_measurement"], "°C");
    }

    #[test]
    fn fahrenheit_unit_is_announced() {
        let config = NodeConfig::default().with_temperature_unit(TemperatureUnit::Fahrenheit);
        let ann = announcement(&config, ItemKind::Temperature).unwrap();
        assert!(ann.payload.contains("°F"));
    }

    #[test]
    fn motion_has_no_unit() {
        let config = NodeConfig::default();
        let ann = announcement(&config, ItemKind::Motion).unwrap();

        let doc: serde_json::Value = serde_json::from_str(&ann.payload).unwrap();
        assert_eq!(doc["device_class"], "motion");
        assert!(doc.get("unit_of_measurement").is_none());
        assert!(ann.topic.starts_with("homeassistant/binary_sensor/"));
    }

    #[test]
    fn light_is_illuminance_in_lux() {
        let config = NodeConfig::default();
        let ann = announcement(&config, ItemKind::Light).unwrap();
        assert!(ann.payload.contains("\"device_class\":\"illuminance\""));
        assert!(ann.payload.contains("\"unit_of_measurement\":\"lx\""));
    }
}
