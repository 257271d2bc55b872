//! Progress events published by the engine
//!
//! The engine never waits on its observers: sinks must return quickly.
//! [`ChannelSink`] forwards into an unbounded channel so a slow consumer
//! (a status panel, a log window) only ever lags behind the simulation.

use crate::client::{Client, ClientId, ServerId};
use crossbeam::channel::{self, Receiver, Sender};

#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    /// A client took a ticket and joined the line
    NewClient(Client),
    /// A server began serving a client
    ClientBeingServed { client: Client, server: ServerId },
    /// A server finished serving a client
    ClientServed { client: Client, server: ServerId },
    /// A server changed between idle and occupied
    ServerStatus {
        server: ServerId,
        idle: bool,
        occupant: Option<ClientId>,
    },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: SimEvent);
}

impl<F> EventSink for F
where
    F: Fn(SimEvent) + Send + Sync,
{
    fn emit(&self, event: SimEvent) {
        self(event)
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: SimEvent) {}
}

/// Forwards events into an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<SimEvent>,
}

impl ChannelSink {
    pub fn new() -> (ChannelSink, Receiver<SimEvent>) {
        let (tx, rx) = channel::unbounded();
        (ChannelSink { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: SimEvent) {
        // a dropped receiver just means nobody is watching any more
        let _ = self.tx.send(event);
    }
}
