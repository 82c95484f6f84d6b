//! Concurrent front-end for the engine
//!
//! [`MatchmakingHub`] puts one [`Engine`] behind a single lock. Every inbound
//! event, including disconnects, is applied and its deliveries are pushed
//! into the target connections' [`EventSink`]s inside the same critical
//! section, so events reach each connection in the order the engine produced
//! them. Sinks must not block; the lock is never held across an `.await`.

use crate::config::EngineConfig;
use crate::connection::ConnectionId;
use crate::engine::{Engine, EngineStats};
use crate::events::{Delivery, InboundEvent, OutboundEvent};
use crate::pool::SelectionPolicy;
use crate::Result;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::warn;

/// Per-connection delivery target
///
/// Implementations include:
/// - `mpsc::UnboundedSender<OutboundEvent>` - typed channel to a connection task
/// - transport-specific sinks that serialize events to frames
pub trait EventSink: Send + Sync {
    /// Push one event to the connection. Must not block.
    fn deliver(&self, event: OutboundEvent) -> std::result::Result<(), EventSinkError>;
}

/// Error type for event sink operations
#[derive(Debug, thiserror::Error)]
pub enum EventSinkError {
    #[error("Connection closed")]
    Closed,

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl EventSink for mpsc::UnboundedSender<OutboundEvent> {
    fn deliver(&self, event: OutboundEvent) -> std::result::Result<(), EventSinkError> {
        self.send(event).map_err(|_| EventSinkError::Closed)
    }
}

/// Lock-guarded engine shared by all connection tasks
pub struct MatchmakingHub<S> {
    engine: Mutex<Engine<S>>,
}

impl<S: EventSink> MatchmakingHub<S> {
    /// Create a hub using the selection strategy named in `config`
    pub fn new(config: EngineConfig) -> Result<Self> {
        Ok(Self {
            engine: Mutex::new(Engine::new(config)?),
        })
    }

    /// Create a hub with an explicit selection policy
    pub fn with_policy(config: EngineConfig, policy: Box<dyn SelectionPolicy>) -> Result<Self> {
        Ok(Self {
            engine: Mutex::new(Engine::with_policy(config, policy)?),
        })
    }

    /// Register a new connection with its sink
    pub fn connect(&self, sink: S) -> Result<ConnectionId> {
        self.engine.lock().register(sink)
    }

    /// Apply one inbound event and deliver the results
    ///
    /// Returns the number of events delivered.
    pub fn dispatch(&self, from: ConnectionId, event: InboundEvent) -> usize {
        let mut engine = self.engine.lock();
        let deliveries = engine.dispatch(from, event);
        deliver_all(&engine, deliveries)
    }

    /// Connection closed. Safe to call more than once.
    pub fn disconnect(&self, id: ConnectionId) -> usize {
        self.dispatch(id, InboundEvent::Disconnect)
    }

    /// Snapshot of the engine counters
    pub fn stats(&self) -> EngineStats {
        self.engine.lock().stats()
    }

    /// Run `f` against a consistent view of the engine
    pub fn inspect<R>(&self, f: impl FnOnce(&Engine<S>) -> R) -> R {
        let engine = self.engine.lock();
        f(&*engine)
    }
}

/// Hub whose connections are plain unbounded channels
pub type ChannelHub = MatchmakingHub<mpsc::UnboundedSender<OutboundEvent>>;

impl ChannelHub {
    /// Register a connection backed by a fresh unbounded channel
    pub fn open_channel(&self) -> Result<(ConnectionId, mpsc::UnboundedReceiver<OutboundEvent>)> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.connect(tx)?;
        Ok((id, rx))
    }
}

fn deliver_all<S: EventSink>(engine: &Engine<S>, deliveries: Vec<Delivery>) -> usize {
    let mut delivered = 0;

    for Delivery { target, event } in deliveries {
        let name = event.name();
        match engine.resolve(target) {
            Ok(sink) => match sink.deliver(event) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(connection_id = %target, event = name, error = %e, "Failed to deliver event");
                }
            },
            Err(_) => {
                warn!(connection_id = %target, event = name, "Dropping event for unknown connection");
            }
        }
    }

    delivered
}
