//! Network Transport Collaborators
//!
//! ## Overview
//!
//! `sensornode-core` never talks to the network directly. It drives a
//! [`Transport`](sensornode_core::Transport): start an operation, get a
//! ticket, wait for it with a deadline. This crate provides the concrete
//! transports a host build links in.
//!
//! ## MQTT
//!
//! **Characteristics:**
//! - QoS 1 (at-least-once) publishes, no retain
//! - Link completion is the broker's `CONNACK`
//! - Publish completion is the matching `PUBACK`
//! - Connection errors consume a retry budget; once it is spent the
//!   pending connect completes as an error instead of waiting out the
//!   deadline
//!
//! Every wait is driven by the caller's timeout. Nothing here blocks
//! longer than the deadline it was given.
//!
//! ## Example Usage
//!
//! ```no_run
//! use sensornode_connectors::mqtt::{MqttConfig, MqttTransport};
//! use sensornode_core::{Item, NodeConfig, Orchestrator, PublishSet};
//!
//! let node = NodeConfig::default();
//! let mut transport = MqttTransport::new(MqttConfig::for_node(&node.node_name, "broker.local"));
//!
//! let mut items = PublishSet::new();
//! items.insert(Item::Light(120));
//! let outcome = Orchestrator::new(&node).run(&items, &mut transport);
//!
//! println!("{}: {:?}", outcome.as_str(), transport.stats());
//! ```

#[cfg(feature = "mqtt")]
pub mod mqtt;

// Re-export common types
#[cfg(feature = "mqtt")]
pub use mqtt::{MqttConfig, MqttTransport};

use thiserror::Error;

/// Common connector errors
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Connection statistics common to all connectors
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConnectionStats {
    /// Total messages acknowledged by the peer
    pub messages_sent: u64,
    /// Total messages rejected, failed or timed out
    pub messages_failed: u64,
    /// Total payload bytes acknowledged
    pub bytes_sent: u64,
    /// Number of connection attempts after the first
    pub reconnections: u32,
    /// Last error message
    pub last_error: Option<String>,
}
