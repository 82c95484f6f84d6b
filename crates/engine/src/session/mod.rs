//! Two-party sessions
//!
//! A [`Session`] always has exactly two distinct members. There is no way to
//! add a third or drop to one: when either member leaves the whole session is
//! discarded by the [`SessionRegistry`].

mod registry;

pub use registry::SessionRegistry;

use crate::connection::ConnectionId;
use crate::events::{current_timestamp_ms, SignalKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Chat message recorded in a session's history. Never mutated once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender: ConnectionId,
    pub body: String,
    /// Unix timestamp (ms)
    pub timestamp: u64,
}

/// Advisory progress of the signaling exchange
///
/// Advanced purely by the kinds of payload relayed. The engine never refuses
/// to forward based on the phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalingPhase {
    Idle,
    OfferSent,
    AnswerReceived,
    /// Both members relayed candidates after the answer
    Established,
}

/// One active pairing
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,

    /// `members[0]` is the initiator
    members: [ConnectionId; 2],

    created_at: u64,
    messages: Vec<Message>,
    phase: SignalingPhase,

    /// Per member: relayed a candidate since the answer went through
    candidates_after_answer: [bool; 2],

    signals_relayed: u64,
}

impl Session {
    /// Create a session. `initiator` drives the offer side of signaling.
    pub(crate) fn new(initiator: ConnectionId, responder: ConnectionId) -> Self {
        debug_assert_ne!(initiator, responder, "a session needs two distinct members");

        Self {
            id: SessionId::new(),
            members: [initiator, responder],
            created_at: current_timestamp_ms(),
            messages: Vec::new(),
            phase: SignalingPhase::Idle,
            candidates_after_answer: [false; 2],
            signals_relayed: 0,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn members(&self) -> [ConnectionId; 2] {
        self.members
    }

    pub fn initiator(&self) -> ConnectionId {
        self.members[0]
    }

    /// Unix timestamp (ms) of creation
    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// Message history in append order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn phase(&self) -> SignalingPhase {
        self.phase
    }

    pub fn signals_relayed(&self) -> u64 {
        self.signals_relayed
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.members.contains(&id)
    }

    /// The other member, if `id` belongs to this session
    pub fn partner_of(&self, id: ConnectionId) -> Option<ConnectionId> {
        match self.members {
            [a, b] if a == id => Some(b),
            [a, b] if b == id => Some(a),
            _ => None,
        }
    }

    fn slot_of(&self, id: ConnectionId) -> Option<usize> {
        self.members.iter().position(|member| *member == id)
    }

    /// Append a message to the history and return it
    pub(crate) fn append_message(&mut self, sender: ConnectionId, body: String) -> &Message {
        self.messages.push(Message {
            id: Uuid::new_v4().to_string(),
            sender,
            body,
            timestamp: current_timestamp_ms(),
        });
        // Just pushed, so the history is non-empty
        &self.messages[self.messages.len() - 1]
    }

    /// Record a relayed signal from `from` and return the resulting phase
    pub(crate) fn record_signal(&mut self, from: ConnectionId, kind: SignalKind) -> SignalingPhase {
        self.signals_relayed += 1;

        match kind {
            SignalKind::Offer => {
                if self.phase == SignalingPhase::Idle {
                    self.phase = SignalingPhase::OfferSent;
                }
            }
            SignalKind::Answer => {
                if self.phase < SignalingPhase::AnswerReceived {
                    self.phase = SignalingPhase::AnswerReceived;
                }
            }
            SignalKind::Candidate => {
                if self.phase == SignalingPhase::AnswerReceived {
                    if let Some(slot) = self.slot_of(from) {
                        self.candidates_after_answer[slot] = true;
                    }
                    if self.candidates_after_answer.iter().all(|seen| *seen) {
                        self.phase = SignalingPhase::Established;
                    }
                }
            }
        }

        self.phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (ConnectionId, ConnectionId, Session) {
        let a = ConnectionId::new(1);
        let b = ConnectionId::new(2);
        (a, b, Session::new(a, b))
    }

    #[test]
    fn test_partner_of() {
        let (a, b, session) = pair();
        assert_eq!(session.partner_of(a), Some(b));
        assert_eq!(session.partner_of(b), Some(a));
        assert_eq!(session.partner_of(ConnectionId::new(3)), None);
        assert_eq!(session.initiator(), a);
    }

    #[test]
    fn test_messages_append_in_order() {
        let (a, b, mut session) = pair();
        session.append_message(a, "hi".to_string());
        session.append_message(b, "hello".to_string());

        let bodies: Vec<_> = session.messages().iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["hi", "hello"]);
        assert_eq!(session.messages()[1].sender, b);
        assert_ne!(session.messages()[0].id, session.messages()[1].id);
    }

    #[test]
    fn test_signaling_phase_progression() {
        let (a, b, mut session) = pair();
        assert_eq!(session.phase(), SignalingPhase::Idle);

        // Early candidates do not move the phase
        assert_eq!(session.record_signal(a, SignalKind::Candidate), SignalingPhase::Idle);
        assert_eq!(session.record_signal(a, SignalKind::Offer), SignalingPhase::OfferSent);
        assert_eq!(
            session.record_signal(a, SignalKind::Candidate),
            SignalingPhase::OfferSent
        );
        assert_eq!(
            session.record_signal(b, SignalKind::Answer),
            SignalingPhase::AnswerReceived
        );
        assert_eq!(
            session.record_signal(b, SignalKind::Candidate),
            SignalingPhase::AnswerReceived
        );
        assert_eq!(
            session.record_signal(a, SignalKind::Candidate),
            SignalingPhase::Established
        );

        // A later offer (renegotiation) does not regress the phase
        assert_eq!(
            session.record_signal(a, SignalKind::Offer),
            SignalingPhase::Established
        );
        assert_eq!(session.signals_relayed(), 7);
    }

    #[test]
    fn test_session_id_display_is_uuid() {
        let id = SessionId::new();
        assert_eq!(id.to_string().len(), 36);
    }
}
