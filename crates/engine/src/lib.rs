//! Pairing and signaling-relay engine for anonymous two-party sessions
//!
//! Connections ask to be paired with a random stranger. The engine keeps a
//! waiting pool, binds two waiting connections into a [`Session`], relays
//! opaque offer/answer/candidate payloads and chat messages between the two
//! members, and tears the session down when either side leaves, skips or
//! disconnects. Media never passes through here.
//!
//! # Features
//!
//! - **Waiting pool**: idempotent enqueue, pluggable partner selection
//!   (FIFO or seeded random)
//! - **Session registry**: eager member index, each connection in at most
//!   one session
//! - **Signaling relay**: payloads forwarded verbatim, phase tracked only
//!   for diagnostics
//! - **Chat relay**: per-session history, optional echo to the sender
//! - **Transport agnostic**: every operation returns a list of [`Delivery`]
//!   values; [`MatchmakingHub`] pushes them into per-connection
//!   [`EventSink`]s under one lock
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │  Transport (WebSocket, tests, ...)                     │
//! │  ↓ InboundEvent                    ↑ OutboundEvent      │
//! │  MatchmakingHub (Mutex<Engine>, EventSink per conn)    │
//! │  └─ Engine                                              │
//! │     ├─ ConnectionRegistry (id → handle, nickname)      │
//! │     ├─ WaitingPool (SelectionPolicy)                   │
//! │     ├─ SessionRegistry (session + member index)        │
//! │     ├─ pairing: seek / leave / skip / teardown          │
//! │     └─ relay: signals / chat / typing                   │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use rendezvous_core::{ChannelHub, EngineConfig, InboundEvent, OutboundEvent};
//!
//! let hub = ChannelHub::new(EngineConfig::default()).unwrap();
//! let (alice, mut alice_rx) = hub.open_channel().unwrap();
//! let (bob, mut bob_rx) = hub.open_channel().unwrap();
//!
//! hub.dispatch(alice, InboundEvent::SeekPartner);
//! assert_eq!(alice_rx.try_recv().unwrap(), OutboundEvent::Waiting);
//!
//! hub.dispatch(bob, InboundEvent::SeekPartner);
//! assert!(matches!(
//!     alice_rx.try_recv().unwrap(),
//!     OutboundEvent::Paired { initiator: true, .. }
//! ));
//! assert!(matches!(
//!     bob_rx.try_recv().unwrap(),
//!     OutboundEvent::Paired { initiator: false, .. }
//! ));
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod connection;
pub mod error;
pub mod events;
pub mod hub;
pub mod pool;
pub mod session;

mod engine;
mod pairing;
mod relay;

pub use config::{EngineConfig, ReseekPolicy, SelectionStrategy};
pub use connection::{ConnectionEntry, ConnectionId, ConnectionRegistry};
pub use engine::{Engine, EngineStats};
pub use error::{Error, Result};
pub use events::{
    current_timestamp_ms, Delivery, ErrorKind, InboundEvent, OutboundEvent, SignalKind,
    TeardownReason,
};
pub use hub::{ChannelHub, EventSink, EventSinkError, MatchmakingHub};
pub use pool::{policy_for, FifoPolicy, RandomPolicy, SelectionPolicy, WaitingPool};
pub use session::{Message, Session, SessionId, SessionRegistry, SignalingPhase};

/// Get the version of this crate
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
