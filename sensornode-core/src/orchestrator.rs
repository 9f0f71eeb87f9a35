//! Connectivity-and-Publish Orchestration
//!
//! ## Overview
//!
//! Given the items a cycle wants to send, the orchestrator brings the link
//! up once and publishes each item with its own bounded acknowledgement
//! wait:
//!
//! ```text
//! run(items)
//!   │ empty? ─────────────────────────────► NothingToDo   (radio stays off)
//!   ▼
//! connect ──► wait(connect_timeout)
//!   │ Error ──────────────────────────────► ConnectFailed
//!   │ Timeout ────────────────────────────► ConnectTimeout
//!   ▼ Acked
//! for item in light, temperature, humidity, motion:
//!     publish ──► wait(publish_timeout) ──► Acked | Error | Timeout (recorded)
//!   │
//!   ▼
//! all acked? ──► Delivered(report) : PartialFailure(report)
//! ```
//!
//! A failed item never stops the ones after it: dropping an unrelated
//! metric because another one timed out would only widen the outage.
//!
//! ## Link reuse
//!
//! The link verdict is kept for the rest of the cycle. A second `run` (the
//! motion publish after the measurement publish) reuses an established
//! link, and a link that already failed is not retried in the same cycle;
//! the next wake-up tries again.
//!
//! ## Commit rule
//!
//! Only acknowledged items are eligible to have their baseline persisted.
//! [`Outcome::is_acked`] is the single question the caller asks.

use heapless::Vec;

use crate::{
    config::NodeConfig,
    constants::MAX_PUBLISH_ITEMS,
    discovery,
    errors::PayloadError,
    items::{Item, ItemKind, PublishSet},
    payload,
    transport::{self, Completion, Transport},
};

/// Per-item delivery verdict
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Delivery {
    /// Item that was attempted
    pub item: Item,
    /// How its publish ended
    pub completion: Completion,
}

/// Verdicts for every attempted item, in publish order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    deliveries: Vec<Delivery, MAX_PUBLISH_ITEMS>,
}

impl Report {
    fn record(&mut self, item: Item, completion: Completion) {
        // Sized for one delivery per item in a PublishSet
        let _ = self.deliveries.push(Delivery { item, completion });
    }

    /// Every attempted item
    pub fn deliveries(&self) -> &[Delivery] {
        &self.deliveries
    }

    /// Items that were not acknowledged, with the reason
    pub fn failures(&self) -> impl Iterator<Item = &Delivery> {
        self.deliveries
            .iter()
            .filter(|d| d.completion != Completion::Acked)
    }

    /// Verdict for the item of `kind`, if it was attempted
    pub fn completion(&self, kind: ItemKind) -> Option<Completion> {
        self.deliveries
            .iter()
            .find(|d| d.item.kind() == kind)
            .map(|d| d.completion)
    }

    /// Whether every attempted item was acknowledged
    pub fn all_acked(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Result of one orchestrator run
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Nothing to send; the transport was not touched
    NothingToDo,
    /// Link up and every item acknowledged
    Delivered(Report),
    /// Link reported failure (retry budget exhausted, auth refused)
    ConnectFailed,
    /// No link verdict within the connect timeout
    ConnectTimeout,
    /// Link up but at least one item was not acknowledged
    PartialFailure(Report),
}

impl Outcome {
    /// Whether the item of `kind` was acknowledged
    pub fn is_acked(&self, kind: ItemKind) -> bool {
        self.report()
            .and_then(|r| r.completion(kind))
            .map_or(false, |c| c == Completion::Acked)
    }

    /// Per-item report, when the link came up
    pub fn report(&self) -> Option<&Report> {
        match self {
            Outcome::Delivered(report) | Outcome::PartialFailure(report) => Some(report),
            _ => None,
        }
    }

    /// Nothing was left unsent
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::NothingToDo | Outcome::Delivered(_))
    }

    /// Short label for logs
    pub const fn as_str(&self) -> &'static str {
        match self {
            Outcome::NothingToDo => "nothing to do",
            Outcome::Delivered(_) => "delivered",
            Outcome::ConnectFailed => "connect failed",
            Outcome::ConnectTimeout => "connect timeout",
            Outcome::PartialFailure(_) => "partial failure",
        }
    }
}

/// How link bring-up ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkOutcome {
    /// Link up, publishes may start
    Connected,
    /// Transport reported failure
    Failed,
    /// No verdict within the connect timeout
    TimedOut,
}

/// Sequences link bring-up and publishes for one wake cycle
#[derive(Debug)]
pub struct Orchestrator<'c> {
    config: &'c NodeConfig,
    link: Option<LinkOutcome>,
}

impl<'c> Orchestrator<'c> {
    /// Orchestrator for a new cycle; the link is not attempted yet
    pub fn new(config: &'c NodeConfig) -> Self {
        Self { config, link: None }
    }

    /// Verdict of this cycle's bring-up, if one was attempted
    pub fn link(&self) -> Option<LinkOutcome> {
        self.link
    }

    /// Whether an earlier run this cycle brought the link up
    pub fn is_connected(&self) -> bool {
        self.link == Some(LinkOutcome::Connected)
    }

    /// Publish `items`, bringing the link up first if needed
    pub fn run<T: Transport + ?Sized>(&mut self, items: &PublishSet, transport: &mut T) -> Outcome {
        if items.is_empty() {
            return Outcome::NothingToDo;
        }

        match self.ensure_link(transport) {
            LinkOutcome::Connected => {}
            LinkOutcome::Failed => return Outcome::ConnectFailed,
            LinkOutcome::TimedOut => return Outcome::ConnectTimeout,
        }

        let mut report = Report::default();
        for item in items.iter() {
            let completion = self.publish(item, transport);
            if completion == Completion::Acked {
                node_debug!("Published {}", item.kind().name());
            } else {
                node_warn!("Publish of {} failed: {}", item.kind().name(), completion.as_str());
            }
            report.record(*item, completion);
        }

        if report.all_acked() {
            Outcome::Delivered(report)
        } else {
            Outcome::PartialFailure(report)
        }
    }

    fn ensure_link<T: Transport + ?Sized>(&mut self, transport: &mut T) -> LinkOutcome {
        if let Some(link) = self.link {
            return link;
        }

        let started = transport.connect();
        let link = match transport::settle(transport, started, self.config.connect_timeout()) {
            Completion::Acked => {
                node_info!("Link up");
                LinkOutcome::Connected
            }
            Completion::Error => {
                node_warn!("Link failed");
                LinkOutcome::Failed
            }
            Completion::Timeout => {
                node_warn!("Link timed out after {} ms", self.config.connect_timeout_ms);
                LinkOutcome::TimedOut
            }
        };
        self.link = Some(link);
        link
    }

    fn publish<T: Transport + ?Sized>(&self, item: &Item, transport: &mut T) -> Completion {
        let timeout = self.config.publish_timeout();

        if let Item::Discovery(kind) = *item {
            return match discovery::announcement(self.config, kind) {
                Ok(ann) => {
                    let started = transport.publish(&ann.topic, &ann.payload);
                    transport::settle(transport, started, timeout)
                }
                Err(e) => {
                    node_warn!("Cannot announce {}: {}", kind.name(), payload_error(&e));
                    Completion::Error
                }
            };
        }

        let encoded = match payload::measurement(item) {
            Some(measurement) => payload::state_topic(self.config, item.kind())
                .and_then(|topic| measurement.map(|m| (topic, m))),
            None => return Completion::Error,
        };

        match encoded {
            Ok((topic, measurement)) => {
                let started = transport.publish(&topic, &measurement);
                transport::settle(transport, started, timeout)
            }
            Err(e) => {
                node_warn!("Cannot encode {}: {}", item.kind().name(), payload_error(&e));
                Completion::Error
            }
        }
    }
}

fn payload_error(err: &PayloadError) -> &'static str {
    match *err {
        PayloadError::TooLong { what, .. } => what,
        PayloadError::Serialize => "serialization",
    }
}
