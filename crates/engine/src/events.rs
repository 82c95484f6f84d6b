//! Boundary events exchanged with the transport collaborator
//!
//! Inbound events are consumed by [`Engine::dispatch`](crate::Engine::dispatch);
//! outbound events are produced as a list of [`Delivery`] values instead of
//! being written to a socket inline, which keeps the engine free of I/O.

use crate::connection::ConnectionId;
use crate::session::SessionId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Events a connection can raise against the engine
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// Transport closed the connection
    Disconnect,
    /// Ask to be paired with a stranger
    SeekPartner,
    /// Leave the current session, or stop waiting
    LeaveSession,
    /// Drop the current partner and look for a new one
    SkipPartner,
    /// Opaque session-description offer
    SignalOffer(Value),
    /// Opaque session-description answer
    SignalAnswer(Value),
    /// Opaque network candidate
    SignalCandidate(Value),
    /// Chat message body
    SendMessage { body: String },
    /// Typing indicator
    SetTyping { is_typing: bool },
    /// Display name shown to future partners
    SetNickname { nickname: String },
}

impl InboundEvent {
    /// Get the event name for logging/debugging
    pub fn name(&self) -> &'static str {
        match self {
            Self::Disconnect => "disconnect",
            Self::SeekPartner => "seek-partner",
            Self::LeaveSession => "leave-session",
            Self::SkipPartner => "skip-partner",
            Self::SignalOffer(_) => "signal-offer",
            Self::SignalAnswer(_) => "signal-answer",
            Self::SignalCandidate(_) => "signal-candidate",
            Self::SendMessage { .. } => "send-message",
            Self::SetTyping { .. } => "set-typing",
            Self::SetNickname { .. } => "set-nickname",
        }
    }
}

/// Which leg of the signaling exchange a payload belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalKind {
    Offer,
    Answer,
    Candidate,
}

/// Why a session was torn down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TeardownReason {
    /// The partner's connection closed
    Disconnected,
    /// The partner called `leave-session`
    LeftVoluntarily,
    /// The partner skipped to someone else
    Skipped,
}

/// Error categories reported in `error` events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    AlreadyPaired,
    NoActiveSession,
    UnknownConnection,
    InvalidNickname,
    CapacityExceeded,
    Internal,
}

/// Events the engine emits towards a connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum OutboundEvent {
    /// Enqueued, no partner available yet
    Waiting,

    /// Matched with a partner
    Paired {
        session_id: SessionId,
        /// Exactly one member of a session is the initiator
        initiator: bool,
        partner_nickname: String,
    },

    /// The session ended from the partner's side
    PartnerLeft { reason: TeardownReason },

    /// Partner's offer, verbatim
    SignalOffer(Value),

    /// Partner's answer, verbatim
    SignalAnswer(Value),

    /// Partner's candidate, verbatim
    SignalCandidate(Value),

    /// Chat message appended to the session history
    NewMessage {
        id: String,
        body: String,
        timestamp: u64,
        sender_is_you: bool,
    },

    /// Partner started or stopped typing
    PartnerTyping { is_typing: bool },

    /// A request from this connection failed
    Error { kind: ErrorKind, detail: String },
}

impl OutboundEvent {
    /// Build the outbound counterpart of a relayed signal
    pub fn signal(kind: SignalKind, payload: Value) -> Self {
        match kind {
            SignalKind::Offer => Self::SignalOffer(payload),
            SignalKind::Answer => Self::SignalAnswer(payload),
            SignalKind::Candidate => Self::SignalCandidate(payload),
        }
    }

    /// Create an error event
    pub fn error(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self::Error {
            kind,
            detail: detail.into(),
        }
    }

    /// Get the event name as it appears on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Paired { .. } => "paired",
            Self::PartnerLeft { .. } => "partner-left",
            Self::SignalOffer(_) => "signal-offer",
            Self::SignalAnswer(_) => "signal-answer",
            Self::SignalCandidate(_) => "signal-candidate",
            Self::NewMessage { .. } => "new-message",
            Self::PartnerTyping { .. } => "partner-typing",
            Self::Error { .. } => "error",
        }
    }
}

/// One outbound event addressed to one connection
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub target: ConnectionId,
    pub event: OutboundEvent,
}

impl Delivery {
    pub fn new(target: ConnectionId, event: OutboundEvent) -> Self {
        Self { target, event }
    }
}

/// Get current timestamp in milliseconds
pub fn current_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_outbound_names_match_wire_tags() {
        let events = vec![
            OutboundEvent::Waiting,
            OutboundEvent::PartnerLeft {
                reason: TeardownReason::Skipped,
            },
            OutboundEvent::SignalCandidate(json!({"candidate": "c"})),
            OutboundEvent::PartnerTyping { is_typing: true },
            OutboundEvent::error(ErrorKind::NoActiveSession, "no session"),
        ];

        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["event"], event.name());
        }
    }

    #[test]
    fn test_signal_payload_serialized_verbatim() {
        let event = OutboundEvent::signal(SignalKind::Offer, json!({"sdp": "x"}));
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value, json!({"event": "signal-offer", "data": {"sdp": "x"}}));
    }

    #[test]
    fn test_partner_left_reason_wire_format() {
        let event = OutboundEvent::PartnerLeft {
            reason: TeardownReason::LeftVoluntarily,
        };
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["data"]["reason"], "left-voluntarily");
    }

    #[test]
    fn test_inbound_event_name() {
        assert_eq!(InboundEvent::SeekPartner.name(), "seek-partner");
        assert_eq!(
            InboundEvent::SetTyping { is_typing: false }.name(),
            "set-typing"
        );
    }
}
