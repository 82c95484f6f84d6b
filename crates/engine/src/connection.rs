//! Connection registry
//!
//! Maps a live connection identity to its transport handle. Identities are
//! assigned by the registry from a monotonically increasing counter, so an id
//! is never handed out twice for the lifetime of the process.

use crate::events::current_timestamp_ms;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Opaque, server-assigned connection identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wrap a raw id. Only the registry mints ids for live connections; this
    /// exists for tests and for transports that echo ids back.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Registry entry for one live connection
#[derive(Debug)]
pub struct ConnectionEntry<H> {
    /// Transport handle used to push outbound events
    pub handle: H,

    /// Display name set via `set-nickname`
    pub nickname: Option<String>,

    /// Unix timestamp (ms) of registration
    pub connected_at: u64,
}

/// Live connections keyed by id
pub struct ConnectionRegistry<H> {
    entries: HashMap<ConnectionId, ConnectionEntry<H>>,
    next_id: u64,
    max_connections: usize,
}

impl<H> ConnectionRegistry<H> {
    /// Create an empty registry holding at most `max_connections` entries
    pub fn new(max_connections: usize) -> Self {
        Self {
            entries: HashMap::new(),
            next_id: 1,
            max_connections,
        }
    }

    /// Register a new connection and assign it a fresh id
    ///
    /// # Errors
    ///
    /// Returns `CapacityExceeded` when the registry is full.
    pub fn register(&mut self, handle: H) -> Result<ConnectionId> {
        if self.entries.len() >= self.max_connections {
            return Err(Error::CapacityExceeded(self.max_connections));
        }

        let id = ConnectionId(self.next_id);
        self.next_id += 1;

        self.entries.insert(
            id,
            ConnectionEntry {
                handle,
                nickname: None,
                connected_at: current_timestamp_ms(),
            },
        );

        Ok(id)
    }

    /// Remove a connection, returning its entry
    ///
    /// This only drops the handle. Pool and session cleanup is the engine's
    /// job and must happen before this is called.
    pub fn remove(&mut self, id: ConnectionId) -> Result<ConnectionEntry<H>> {
        self.entries
            .remove(&id)
            .ok_or(Error::UnknownConnection(id))
    }

    /// Resolve an id to its transport handle
    pub fn resolve(&self, id: ConnectionId) -> Result<&H> {
        self.entries
            .get(&id)
            .map(|entry| &entry.handle)
            .ok_or(Error::UnknownConnection(id))
    }

    pub fn entry(&self, id: ConnectionId) -> Option<&ConnectionEntry<H>> {
        self.entries.get(&id)
    }

    pub fn entry_mut(&mut self, id: ConnectionId) -> Option<&mut ConnectionEntry<H>> {
        self.entries.get_mut(&id)
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Number of live connections
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
