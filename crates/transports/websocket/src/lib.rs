//! WebSocket transport for the rendezvous pairing engine
//!
//! Binds the engine's inbound and outbound events to JSON-RPC 2.0 over
//! WebSocket so browsers can talk to it directly.
//!
//! # Protocol
//!
//! - Client requests: `method` is an inbound event name (`seek-partner`,
//!   `leave-session`, `skip-partner`, `signal-offer`, `signal-answer`,
//!   `signal-candidate`, `send-message`, `set-typing`, `set-nickname`) or
//!   `server.stats`. Requests with an `id` are acknowledged with
//!   `{"accepted": true}`.
//! - Server notifications: `method` is the outbound event name, `params` the
//!   event data. Signaling payloads are passed through untouched.
//! - Opening the socket is `connect`; closing it is `disconnect`.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │  Browser clients                                        │
//! │  ↓ (JSON-RPC 2.0 over WebSocket)                        │
//! │  WebSocketSignalingServer (accept loop)                 │
//! │  └─ handle_connection (one task per socket)             │
//! │     ├─ reader: request → InboundEvent → hub.dispatch    │
//! │     └─ writer: WsSink queue → notifications             │
//! │     ↓                                                   │
//! │  rendezvous_core::MatchmakingHub                        │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use rendezvous_websocket::{WebSocketServerConfig, WebSocketSignalingServer};
//!
//! # async fn example() -> rendezvous_websocket::Result<()> {
//! let config = WebSocketServerConfig::default().with_bind_address("127.0.0.1:8080");
//! let server = WebSocketSignalingServer::new(config)?;
//!
//! let handle = server.start().await?;
//! println!("listening on ws://{}", handle.local_addr());
//!
//! handle.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod handler;
pub mod protocol;
mod server;

pub use config::WebSocketServerConfig;
pub use error::{Error, Result};
pub use handler::{SharedState, WsSink};
pub use server::{WebSocketServerHandle, WebSocketSignalingServer};

/// Get the version of this crate
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
