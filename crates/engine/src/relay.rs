//! Relay dispatcher
//!
//! Forwards signaling payloads, chat messages and typing indicators from one
//! session member to the other. Payloads are never inspected; only the
//! sender and its session are checked.

use crate::connection::ConnectionId;
use crate::engine::Engine;
use crate::events::{Delivery, OutboundEvent, SignalKind};
use crate::{Error, Result};
use serde_json::Value;
use tracing::debug;

impl<H> Engine<H> {
    /// Forward an offer to the partner of `from`
    pub fn forward_offer(&mut self, from: ConnectionId, payload: Value) -> Result<Vec<Delivery>> {
        self.forward_signal(from, SignalKind::Offer, payload)
    }

    /// Forward an answer to the partner of `from`
    pub fn forward_answer(&mut self, from: ConnectionId, payload: Value) -> Result<Vec<Delivery>> {
        self.forward_signal(from, SignalKind::Answer, payload)
    }

    /// Forward a network candidate to the partner of `from`. May be called
    /// any number of times.
    pub fn forward_candidate(
        &mut self,
        from: ConnectionId,
        payload: Value,
    ) -> Result<Vec<Delivery>> {
        self.forward_signal(from, SignalKind::Candidate, payload)
    }

    /// Forward a signaling payload verbatim
    ///
    /// # Errors
    ///
    /// `NoActiveSession` if `from` is not paired.
    pub fn forward_signal(
        &mut self,
        from: ConnectionId,
        kind: SignalKind,
        payload: Value,
    ) -> Result<Vec<Delivery>> {
        self.ensure_registered(from)?;

        let session = self
            .sessions
            .lookup_mut(from)
            .ok_or(Error::NoActiveSession(from))?;
        let partner = session
            .partner_of(from)
            .ok_or(Error::NoActiveSession(from))?;
        let phase = session.record_signal(from, kind);
        let session_id = session.id();

        self.signals_relayed += 1;

        debug!(
            session_id = %session_id,
            from = %from,
            to = %partner,
            kind = ?kind,
            phase = ?phase,
            "Relaying signal"
        );

        Ok(vec![Delivery::new(partner, OutboundEvent::signal(kind, payload))])
    }

    /// Append a chat message to the session history and relay it
    ///
    /// The partner receives `new-message` with `sender_is_you: false`. With
    /// `echo_messages_to_sender` the sender receives the same message with
    /// `sender_is_you: true`.
    ///
    /// # Errors
    ///
    /// `NoActiveSession` if `from` is not paired.
    pub fn forward_chat_message(
        &mut self,
        from: ConnectionId,
        body: String,
    ) -> Result<Vec<Delivery>> {
        self.ensure_registered(from)?;
        let echo = self.config.echo_messages_to_sender;

        let session = self
            .sessions
            .lookup_mut(from)
            .ok_or(Error::NoActiveSession(from))?;
        let partner = session
            .partner_of(from)
            .ok_or(Error::NoActiveSession(from))?;
        let session_id = session.id();
        let message = session.append_message(from, body).clone();

        self.messages_relayed += 1;

        debug!(
            session_id = %session_id,
            from = %from,
            message_id = %message.id,
            bytes = message.body.len(),
            "Relaying chat message"
        );

        let to_event = |sender_is_you| OutboundEvent::NewMessage {
            id: message.id.clone(),
            body: message.body.clone(),
            timestamp: message.timestamp,
            sender_is_you,
        };

        let mut deliveries = vec![Delivery::new(partner, to_event(false))];
        if echo {
            deliveries.push(Delivery::new(from, to_event(true)));
        }
        Ok(deliveries)
    }

    /// Forward a typing indicator, best effort
    ///
    /// Silently dropped when `from` has no session (it may have ended while
    /// the indicator was in flight).
    pub fn forward_typing(&mut self, from: ConnectionId, is_typing: bool) -> Vec<Delivery> {
        let partner = self
            .sessions
            .lookup(from)
            .and_then(|session| session.partner_of(from));

        match partner {
            Some(partner) if self.connections.contains(from) => {
                vec![Delivery::new(partner, OutboundEvent::PartnerTyping { is_typing })]
            }
            _ => {
                debug!(connection_id = %from, "Dropping typing indicator without session");
                Vec::new()
            }
        }
    }
}
