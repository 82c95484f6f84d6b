//! Engine state and event dispatch
//!
//! [`Engine`] owns the connection registry, the waiting pool and the session
//! registry as one value. It performs no I/O: every operation returns the
//! [`Delivery`] list the transport should push out. Pairing lives in
//! `pairing.rs`, relaying in `relay.rs`.

use crate::config::EngineConfig;
use crate::connection::{ConnectionId, ConnectionRegistry};
use crate::events::{current_timestamp_ms, Delivery, InboundEvent, OutboundEvent, TeardownReason};
use crate::pool::{policy_for, SelectionPolicy, WaitingPool};
use crate::session::{Session, SessionRegistry};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Point-in-time counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    /// Live connections
    pub connections: usize,
    /// Connections in the waiting pool
    pub waiting: usize,
    /// Active sessions
    pub active_sessions: usize,
    /// Sessions created since start
    pub sessions_created: u64,
    /// Chat messages relayed since start
    pub messages_relayed: u64,
    /// Offers, answers and candidates relayed since start
    pub signals_relayed: u64,
}

/// Pairing and relay state machine
///
/// `H` is the transport handle stored per connection. The engine never calls
/// into it; it is only handed back through [`Engine::resolve`].
pub struct Engine<H> {
    pub(crate) config: EngineConfig,
    pub(crate) connections: ConnectionRegistry<H>,
    pub(crate) pool: WaitingPool,
    pub(crate) sessions: SessionRegistry,
    pub(crate) sessions_created: u64,
    pub(crate) messages_relayed: u64,
    pub(crate) signals_relayed: u64,
}

impl<H> Engine<H> {
    /// Create an engine using the selection strategy named in `config`
    pub fn new(config: EngineConfig) -> Result<Self> {
        let policy = policy_for(config.selection, config.selection_seed);
        Self::with_policy(config, policy)
    }

    /// Create an engine with an explicit selection policy
    pub fn with_policy(config: EngineConfig, policy: Box<dyn SelectionPolicy>) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            connections: ConnectionRegistry::new(config.max_connections),
            pool: WaitingPool::new(policy),
            sessions: SessionRegistry::new(),
            sessions_created: 0,
            messages_relayed: 0,
            signals_relayed: 0,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register a freshly opened connection
    pub fn register(&mut self, handle: H) -> Result<ConnectionId> {
        let id = self.connections.register(handle)?;
        info!(
            connection_id = %id,
            connections = self.connections.len(),
            "Connection registered"
        );
        Ok(id)
    }

    /// Unregister a closed connection
    ///
    /// Removes it from the waiting pool and tears down its session (the
    /// partner gets `partner-left(disconnected)`) before the id stops
    /// resolving.
    pub fn unregister(&mut self, id: ConnectionId) -> Result<Vec<Delivery>> {
        if !self.connections.contains(id) {
            return Err(Error::UnknownConnection(id));
        }

        let was_waiting = self.pool.remove(id);
        let deliveries = self.teardown(id, TeardownReason::Disconnected);
        let entry = self.connections.remove(id)?;
        let connected_ms = current_timestamp_ms().saturating_sub(entry.connected_at);

        info!(
            connection_id = %id,
            was_waiting,
            connected_ms,
            connections = self.connections.len(),
            "Connection unregistered"
        );

        Ok(deliveries)
    }

    /// Resolve a connection id to its transport handle
    pub fn resolve(&self, id: ConnectionId) -> Result<&H> {
        self.connections.resolve(id)
    }

    /// Session `id` currently belongs to
    pub fn lookup(&self, id: ConnectionId) -> Option<&Session> {
        self.sessions.lookup(id)
    }

    pub fn is_waiting(&self, id: ConnectionId) -> bool {
        self.pool.contains(id)
    }

    pub fn is_connected(&self, id: ConnectionId) -> bool {
        self.connections.contains(id)
    }

    pub fn pool(&self) -> &WaitingPool {
        &self.pool
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn connections(&self) -> &ConnectionRegistry<H> {
        &self.connections
    }

    /// Set the display name partners will see
    pub fn set_nickname(&mut self, id: ConnectionId, nickname: &str) -> Result<()> {
        let trimmed = nickname.trim();
        let len = trimmed.chars().count();
        if len == 0 || len > self.config.max_nickname_len {
            return Err(Error::InvalidNickname(format!(
                "nickname must be 1-{} characters",
                self.config.max_nickname_len
            )));
        }

        let entry = self
            .connections
            .entry_mut(id)
            .ok_or(Error::UnknownConnection(id))?;
        entry.nickname = Some(trimmed.to_string());

        debug!(connection_id = %id, nickname = trimmed, "Nickname set");
        Ok(())
    }

    /// Name shown to the partner of `id`
    pub(crate) fn nickname_of(&self, id: ConnectionId) -> String {
        self.connections
            .entry(id)
            .and_then(|entry| entry.nickname.clone())
            .unwrap_or_else(|| self.config.default_nickname.clone())
    }

    /// Handle one inbound event from `from`
    ///
    /// Failures that the client should hear about come back as an `error`
    /// delivery to `from`. `UnknownConnection` is logged and dropped.
    pub fn dispatch(&mut self, from: ConnectionId, event: InboundEvent) -> Vec<Delivery> {
        let name = event.name();

        let result = match event {
            InboundEvent::Disconnect => self.unregister(from),
            InboundEvent::SeekPartner => self.request_pairing(from),
            InboundEvent::LeaveSession => self.leave_session(from),
            InboundEvent::SkipPartner => self.skip_partner(from),
            InboundEvent::SignalOffer(payload) => self.forward_offer(from, payload),
            InboundEvent::SignalAnswer(payload) => self.forward_answer(from, payload),
            InboundEvent::SignalCandidate(payload) => self.forward_candidate(from, payload),
            InboundEvent::SendMessage { body } => self.forward_chat_message(from, body),
            InboundEvent::SetTyping { is_typing } => Ok(self.forward_typing(from, is_typing)),
            InboundEvent::SetNickname { nickname } => {
                self.set_nickname(from, &nickname).map(|()| Vec::new())
            }
        };

        match result {
            Ok(deliveries) => deliveries,
            Err(e) if e.is_client_visible() && self.connections.contains(from) => {
                debug!(connection_id = %from, event = name, error = %e, "Event rejected");
                vec![Delivery::new(
                    from,
                    OutboundEvent::error(e.kind(), e.to_string()),
                )]
            }
            Err(e) => {
                warn!(connection_id = %from, event = name, error = %e, "Dropping event");
                Vec::new()
            }
        }
    }

    /// Snapshot of the engine counters
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            connections: self.connections.len(),
            waiting: self.pool.len(),
            active_sessions: self.sessions.len(),
            sessions_created: self.sessions_created,
            messages_relayed: self.messages_relayed,
            signals_relayed: self.signals_relayed,
        }
    }

    pub(crate) fn ensure_registered(&self, id: ConnectionId) -> Result<()> {
        if self.connections.contains(id) {
            Ok(())
        } else {
            Err(Error::UnknownConnection(id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ErrorKind;

    fn engine() -> Engine<()> {
        Engine::new(EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EngineConfig::default().with_max_connections(0);
        assert!(matches!(
            Engine::<()>::new(config),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_unregister_unknown_connection() {
        let mut engine = engine();
        let ghost = ConnectionId::new(99);

        assert_eq!(engine.unregister(ghost), Err(Error::UnknownConnection(ghost)));
        assert!(engine.dispatch(ghost, InboundEvent::Disconnect).is_empty());
        assert!(engine.dispatch(ghost, InboundEvent::SeekPartner).is_empty());
    }

    #[test]
    fn test_unregister_removes_waiting_entry() {
        let mut engine = engine();
        let a = engine.register(()).unwrap();
        engine.dispatch(a, InboundEvent::SeekPartner);
        assert!(engine.is_waiting(a));

        let deliveries = engine.unregister(a).unwrap();
        assert!(deliveries.is_empty());
        assert!(!engine.is_waiting(a));
        assert!(!engine.is_connected(a));
        assert!(engine.resolve(a).is_err());
    }

    #[test]
    fn test_set_nickname_validation() {
        let mut engine = engine();
        let a = engine.register(()).unwrap();

        let deliveries = engine.dispatch(
            a,
            InboundEvent::SetNickname {
                nickname: "   ".to_string(),
            },
        );
        assert!(matches!(
            deliveries.as_slice(),
            [Delivery { target, event: OutboundEvent::Error { kind: ErrorKind::InvalidNickname, .. } }]
                if *target == a
        ));

        assert!(engine.set_nickname(a, "  Alice ").is_ok());
        assert_eq!(engine.nickname_of(a), "Alice");
    }

    #[test]
    fn test_nickname_length_limit_counts_characters() {
        let mut engine = engine();
        let a = engine.register(()).unwrap();
        let max = engine.config().max_nickname_len;

        assert!(engine.set_nickname(a, &"x".repeat(max)).is_ok());
        assert!(matches!(
            engine.set_nickname(a, &"x".repeat(max + 1)),
            Err(Error::InvalidNickname(_))
        ));

        // Two bytes per character, still within the limit
        let accented = "\u{e9}".repeat(max);
        assert!(accented.len() > max);
        assert!(engine.set_nickname(a, &accented).is_ok());
        assert_eq!(engine.nickname_of(a), accented);

        assert!(matches!(
            engine.set_nickname(a, &"\u{e9}".repeat(max + 1)),
            Err(Error::InvalidNickname(_))
        ));
        assert_eq!(engine.nickname_of(a), accented);
    }

    #[test]
    fn test_default_nickname() {
        let mut engine = engine();
        let a = engine.register(()).unwrap();
        assert_eq!(engine.nickname_of(a), "Stranger");
    }

    #[test]
    fn test_stats() {
        let mut engine = engine();
        let a = engine.register(()).unwrap();
        let b = engine.register(()).unwrap();
        let c = engine.register(()).unwrap();

        engine.dispatch(a, InboundEvent::SeekPartner);
        engine.dispatch(b, InboundEvent::SeekPartner);
        engine.dispatch(c, InboundEvent::SeekPartner);

        let stats = engine.stats();
        assert_eq!(stats.connections, 3);
        assert_eq!(stats.waiting, 1);
        assert_eq!(stats.active_sessions, 1);
        assert_eq!(stats.sessions_created, 1);
    }
}
