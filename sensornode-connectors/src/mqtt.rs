//! MQTT transport over the `rumqttc` synchronous client
//!
//! ## Ticket bookkeeping
//!
//! ```text
//! connect() ─► Ticket ───────────────────────── ConnAck(Success) ─► Acked
//!                                           └── error × budget ──► Error
//!
//! publish() ─► Ticket ─► queued ─► Outgoing::Publish(pkid) ─► PubAck(pkid) ─► Acked
//!                                                          └─ link drop ───► Error
//! ```
//!
//! `rumqttc` assigns packet ids when the event loop sends a publish, in
//! request order, so tickets waiting for an id form a FIFO.
//!
//! `wait` is the only place the event loop is driven. It polls with
//! `recv_timeout` using what is left of the caller's deadline, so a wait
//! never outlives its timeout.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use rumqttc::{
    Client, ConnectReturnCode, Connection, ConnectionError, Event, MqttOptions, Outgoing, Packet,
    QoS,
};
use serde::{Deserialize, Serialize};

use sensornode_core::{
    Completion, Ticket, Transport, TransportError, constants::DEFAULT_NODE_NAME,
};

use crate::{ConnectionStats, ConnectorError};

/// Default broker port
pub const DEFAULT_PORT: u16 = 1883;

/// Connection errors tolerated before a pending connect fails
pub const DEFAULT_MAX_CONNECT_ATTEMPTS: u32 = 5;

/// Smallest keep-alive the client accepts
pub const MIN_KEEP_ALIVE_SECS: u64 = 5;

/// Broker connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Broker host name or address
    pub host: String,
    /// Broker port
    pub port: u16,
    /// MQTT client identifier
    pub client_id: String,
    /// Optional user name
    pub username: Option<String>,
    /// Password, used only with a user name
    pub password: Option<String>,
    /// Keep-alive interval in seconds
    pub keep_alive_secs: u64,
    /// Capacity of the client request channel
    pub request_capacity: usize,
    /// Connection errors tolerated before a pending connect fails
    pub max_connect_attempts: u32,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            client_id: DEFAULT_NODE_NAME.to_string(),
            username: None,
            password: None,
            keep_alive_secs: 60,
            request_capacity: 10,
            max_connect_attempts: DEFAULT_MAX_CONNECT_ATTEMPTS,
        }
    }
}

impl MqttConfig {
    /// Settings for `node_name` talking to `host` on the default port
    pub fn for_node(node_name: &str, host: &str) -> Self {
        Self {
            host: host.to_string(),
            client_id: node_name.to_string(),
            ..Self::default()
        }
    }

    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json(text: &str) -> Result<Self, ConnectorError> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| ConnectorError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the client cannot work with
    pub fn validate(&self) -> Result<(), ConnectorError> {
        if self.host.is_empty() {
            return Err(ConnectorError::ConfigError("host is empty".into()));
        }
        if self.client_id.is_empty() {
            return Err(ConnectorError::ConfigError("client_id is empty".into()));
        }
        if self.keep_alive_secs < MIN_KEEP_ALIVE_SECS {
            return Err(ConnectorError::ConfigError(format!(
                "keep_alive_secs must be at least {}",
                MIN_KEEP_ALIVE_SECS
            )));
        }
        if self.request_capacity == 0 {
            return Err(ConnectorError::ConfigError("request_capacity is zero".into()));
        }
        if self.max_connect_attempts == 0 {
            return Err(ConnectorError::ConfigError("max_connect_attempts is zero".into()));
        }
        Ok(())
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(self.client_id.clone(), self.host.clone(), self.port);
        options.set_keep_alive(Duration::from_secs(self.keep_alive_secs.max(MIN_KEEP_ALIVE_SECS)));
        options.set_clean_session(true);
        if let Some(username) = &self.username {
            options.set_credentials(username.clone(), self.password.clone().unwrap_or_default());
        }
        options
    }
}

/// Maps tickets to broker events. Holds no connection, so it can be fed
/// events directly.
#[derive(Debug, Default)]
struct Tracker {
    next: u32,
    connect: Option<Ticket>,
    connected: bool,
    failed_attempts: u32,
    awaiting_pkid: VecDeque<(Ticket, usize)>,
    in_flight: HashMap<u16, (Ticket, usize)>,
    settled: HashMap<Ticket, Completion>,
    abandoned: HashSet<Ticket>,
    stats: ConnectionStats,
}

impl Tracker {
    fn issue(&mut self) -> Ticket {
        let ticket = Ticket(self.next);
        self.next = self.next.wrapping_add(1);
        ticket
    }

    fn start_connect(&mut self) -> Ticket {
        let ticket = self.issue();
        if self.connected {
            self.settle(ticket, Completion::Acked);
        } else {
            self.connect = Some(ticket);
            self.failed_attempts = 0;
        }
        ticket
    }

    fn start_publish(&mut self, len: usize) -> Ticket {
        let ticket = self.issue();
        self.awaiting_pkid.push_back((ticket, len));
        ticket
    }

    fn is_pending(&self, ticket: Ticket) -> bool {
        self.connect == Some(ticket)
            || self.awaiting_pkid.iter().any(|(t, _)| *t == ticket)
            || self.in_flight.values().any(|(t, _)| *t == ticket)
    }

    fn take(&mut self, ticket: Ticket) -> Option<Completion> {
        self.settled.remove(&ticket)
    }

    fn settle(&mut self, ticket: Ticket, completion: Completion) {
        if !self.abandoned.remove(&ticket) {
            self.settled.insert(ticket, completion);
        }
    }

    /// The caller stopped waiting for `ticket`
    fn abandon(&mut self, ticket: Ticket) {
        if self.connect == Some(ticket) {
            self.connect = None;
            return;
        }
        if self.is_pending(ticket) {
            self.abandoned.insert(ticket);
            self.stats.messages_failed += 1;
        }
    }

    fn on_event(&mut self, event: &Event) {
        match event {
            Event::Incoming(Packet::ConnAck(ack)) => {
                if ack.code == ConnectReturnCode::Success {
                    info!("MQTT connected");
                    self.connected = true;
                    self.failed_attempts = 0;
                    if let Some(ticket) = self.connect.take() {
                        self.settle(ticket, Completion::Acked);
                    }
                } else {
                    self.refused(ack.code);
                }
            }
            Event::Outgoing(Outgoing::Publish(pkid)) => {
                if let Some(entry) = self.awaiting_pkid.pop_front() {
                    self.in_flight.insert(*pkid, entry);
                }
            }
            Event::Incoming(Packet::PubAck(ack)) => {
                if let Some((ticket, len)) = self.in_flight.remove(&ack.pkid) {
                    debug!("PubAck for packet {}", ack.pkid);
                    if !self.abandoned.contains(&ticket) {
                        self.stats.messages_sent += 1;
                        self.stats.bytes_sent += len as u64;
                    }
                    self.settle(ticket, Completion::Acked);
                }
            }
            _ => {}
        }
    }

    fn on_error(&mut self, err: &ConnectionError, max_attempts: u32) {
        self.stats.last_error = Some(err.to_string());

        if let ConnectionError::ConnectionRefused(code) = err {
            self.refused(*code);
            return;
        }

        if self.connected {
            warn!("MQTT link lost: {}", err);
            self.connected = false;
            self.fail_in_flight();
        }

        if let Some(ticket) = self.connect {
            self.failed_attempts += 1;
            if self.failed_attempts >= max_attempts {
                warn!("MQTT connect gave up after {} attempts: {}", self.failed_attempts, err);
                self.connect = None;
                self.settle(ticket, Completion::Error);
            } else {
                debug!("MQTT connect attempt {} failed: {}", self.failed_attempts, err);
                self.stats.reconnections += 1;
            }
        }
    }

    /// Broker answered but refused the session. Retrying will not help.
    fn refused(&mut self, code: ConnectReturnCode) {
        warn!("MQTT connection refused: {:?}", code);
        self.stats.last_error = Some(format!("connection refused: {:?}", code));
        self.connected = false;
        if let Some(ticket) = self.connect.take() {
            self.settle(ticket, Completion::Error);
        }
        self.fail_in_flight();
    }

    fn fail_in_flight(&mut self) {
        let waiting: Vec<Ticket> = self
            .awaiting_pkid
            .drain(..)
            .map(|(t, _)| t)
            .chain(self.in_flight.drain().map(|(_, (t, _))| t))
            .collect();
        for ticket in waiting {
            if !self.abandoned.contains(&ticket) {
                self.stats.messages_failed += 1;
            }
            self.settle(ticket, Completion::Error);
        }
    }
}

/// [`Transport`] backed by an MQTT broker
pub struct MqttTransport {
    config: MqttConfig,
    client: Option<Client>,
    connection: Option<Connection>,
    tracker: Tracker,
}

impl MqttTransport {
    /// Transport for `config`. Nothing touches the network until
    /// [`Transport::connect`].
    pub fn new(config: MqttConfig) -> Self {
        Self {
            config,
            client: None,
            connection: None,
            tracker: Tracker::default(),
        }
    }

    /// Broker settings
    pub fn config(&self) -> &MqttConfig {
        &self.config
    }

    /// Whether the broker acknowledged the session
    pub fn is_connected(&self) -> bool {
        self.tracker.connected
    }

    /// Delivery counters
    pub fn stats(&self) -> &ConnectionStats {
        &self.tracker.stats
    }

    /// Send DISCONNECT and drive the event loop until it is written or
    /// `timeout` elapses
    pub fn disconnect(&mut self, timeout: Duration) {
        let (Some(client), Some(connection)) = (self.client.take(), self.connection.as_mut()) else {
            return;
        };

        if client.try_disconnect().is_ok() {
            let deadline = Instant::now() + timeout;
            loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }
                match connection.recv_timeout(remaining) {
                    Ok(Ok(Event::Outgoing(Outgoing::Disconnect))) | Ok(Err(_)) | Err(_) => break,
                    Ok(Ok(_)) => {}
                }
            }
        }

        self.connection = None;
        self.tracker.connected = false;
        info!("MQTT disconnected");
    }
}

impl Transport for MqttTransport {
    fn connect(&mut self) -> Result<Ticket, TransportError> {
        if self.client.is_none() {
            info!(
                "MQTT connecting to {}:{} as {}",
                self.config.host, self.config.port, self.config.client_id
            );
            let (client, connection) = Client::new(self.config.options(), self.config.request_capacity);
            self.client = Some(client);
            self.connection = Some(connection);
        }
        Ok(self.tracker.start_connect())
    }

    fn publish(&mut self, topic: &str, payload: &str) -> Result<Ticket, TransportError> {
        let client = match self.client.as_mut() {
            Some(client) if self.tracker.connected => client,
            _ => return Err(TransportError::NotConnected),
        };

        match client.try_publish(topic, QoS::AtLeastOnce, false, payload.as_bytes().to_vec()) {
            Ok(()) => Ok(self.tracker.start_publish(payload.len())),
            Err(e) => {
                warn!("MQTT publish to {} rejected: {}", topic, e);
                self.tracker.stats.messages_failed += 1;
                self.tracker.stats.last_error = Some(e.to_string());
                Err(TransportError::Rejected)
            }
        }
    }

    fn wait(&mut self, ticket: Ticket, timeout: Duration) -> Completion {
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(completion) = self.tracker.take(ticket) {
                return completion;
            }
            if !self.tracker.is_pending(ticket) {
                return Completion::Error;
            }
            let Some(connection) = self.connection.as_mut() else {
                return Completion::Error;
            };

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                self.tracker.abandon(ticket);
                return Completion::Timeout;
            }

            match connection.recv_timeout(remaining) {
                Ok(Ok(event)) => self.tracker.on_event(&event),
                Ok(Err(err)) => self.tracker.on_error(&err, self.config.max_connect_attempts),
                // Deadline reached; the next pass reports the timeout
                Err(_) => {}
            }
        }
    }
}
