//! Transport collaborator interface
//!
//! The network stack is asynchronous: connecting and publishing both start
//! an operation that finishes later. The core sees each one as a [`Ticket`]
//! and resolves it with the same bounded wait:
//!
//! ```text
//! connect()         ──► Ticket ─┐
//! publish(t, p)     ──► Ticket ─┼──► wait(ticket, timeout) ──► Acked | Error | Timeout
//! ```
//!
//! There is no unbounded wait anywhere: a stuck network costs at most the
//! configured timeout, then the node goes back to sleep.
//!
//! Implementations resolve their own retries internally (for example a
//! Wi-Fi association retry budget) and report the final verdict as
//! [`Completion::Error`].

use core::time::Duration;

use crate::errors::TransportError;

/// Handle to an in-flight connect or publish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Ticket(pub u32);

/// How an in-flight operation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Completion {
    /// Connected, or publish acknowledged by the broker
    Acked,
    /// Operation failed
    Error,
    /// No verdict within the timeout
    Timeout,
}

impl Completion {
    /// Short label for logs
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Acked => "acked",
            Self::Error => "error",
            Self::Timeout => "timeout",
        }
    }
}

/// Network transport used by the orchestrator
pub trait Transport {
    /// Start bringing the link up
    fn connect(&mut self) -> Result<Ticket, TransportError>;

    /// Start publishing `payload` on `topic`
    fn publish(&mut self, topic: &str, payload: &str) -> Result<Ticket, TransportError>;

    /// Block until `ticket` completes or `timeout` elapses
    fn wait(&mut self, ticket: Ticket, timeout: Duration) -> Completion;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn connect(&mut self) -> Result<Ticket, TransportError> {
        (**self).connect()
    }

    fn publish(&mut self, topic: &str, payload: &str) -> Result<Ticket, TransportError> {
        (**self).publish(topic, payload)
    }

    fn wait(&mut self, ticket: Ticket, timeout: Duration) -> Completion {
        (**self).wait(ticket, timeout)
    }
}

/// Resolve a started operation with a bounded wait.
///
/// An operation the transport refused to start counts as [`Completion::Error`]
/// without waiting. Any returned ticket, whatever its value, means the
/// operation started.
pub fn settle<T: Transport + ?Sized>(
    transport: &mut T,
    started: Result<Ticket, TransportError>,
    timeout: Duration,
) -> Completion {
    match started {
        Ok(ticket) => transport.wait(ticket, timeout),
        Err(e) => {
            node_warn!("Transport refused operation: {}", e.as_str());
            Completion::Error
        }
    }
}

impl TransportError {
    /// Short label for logs
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotConnected => "not connected",
            Self::Rejected => "rejected",
        }
    }
}
