//! Topics and measurement payloads
//!
//! Everything is formatted into fixed-capacity `heapless` strings so a
//! malformed configuration shows up as a [`PayloadError`] instead of a
//! truncated topic on the broker.
//!
//! | Item        | Topic                 | Payload   |
//! |-------------|-----------------------|-----------|
//! | Light       | `{node}/light`        | `120`     |
//! | Temperature | `{node}/temperature`  | `20.50`   |
//! | Humidity    | `{node}/humidity`     | `45.25`   |
//! | Motion      | `{node}/motion`       | `on`/`off`|

use core::fmt::Write;

use heapless::String;

use crate::{
    config::NodeConfig,
    constants::{MEASUREMENT_MAX_LEN, TOPIC_MAX_LEN},
    errors::PayloadError,
    items::{Item, ItemKind},
};

/// Topic buffer
pub type Topic = String<TOPIC_MAX_LEN>;

/// Measurement payload buffer
pub type Measurement = String<MEASUREMENT_MAX_LEN>;

/// `{node}/{suffix}` for `kind`
pub fn state_topic(config: &NodeConfig, kind: ItemKind) -> Result<Topic, PayloadError> {
    let mut topic = Topic::new();
    write!(topic, "{}/{}", config.node_name, config.topics.get(kind))
        .map_err(|_| too_long("topic", TOPIC_MAX_LEN))?;
    Ok(topic)
}

/// `{prefix}/{node}/{suffix}/config` for `kind`
pub fn discovery_topic(config: &NodeConfig, kind: ItemKind) -> Result<Topic, PayloadError> {
    let mut topic = Topic::new();
    write!(
        topic,
        "{}/{}/{}/config",
        config.discovery.prefix(kind),
        config.node_name,
        config.topics.get(kind)
    )
    .map_err(|_| too_long("discovery topic", TOPIC_MAX_LEN))?;
    Ok(topic)
}

/// Payload for a state item. `None` for discovery items, which carry a
/// document rather than a measurement.
pub fn measurement(item: &Item) -> Option<Result<Measurement, PayloadError>> {
    let mut out = Measurement::new();
    let written = match *item {
        Item::Light(lux) => write!(out, "{}", lux),
        Item::Temperature(value) | Item::Humidity(value) => write!(out, "{:.2}", value),
        Item::Motion(level) => out.push_str(if level { "on" } else { "off" }).map_err(|_| core::fmt::Error),
        Item::Discovery(_) => return None,
    };
    Some(
        written
            .map(|_| out)
            .map_err(|_| too_long("measurement", MEASUREMENT_MAX_LEN)),
    )
}

fn too_long(what: &'static str, max: usize) -> PayloadError {
    PayloadError::TooLong { what, max }
}
