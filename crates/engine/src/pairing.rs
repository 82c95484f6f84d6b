//! Pairing and teardown
//!
//! A connection is in at most one of {waiting pool, a session} at any time.
//! Every path here maintains that, including the re-seek and skip paths
//! which always tear the old session down before searching.

use crate::config::ReseekPolicy;
use crate::connection::ConnectionId;
use crate::engine::Engine;
use crate::events::{current_timestamp_ms, Delivery, OutboundEvent, TeardownReason};
use crate::session::{Session, SessionId};
use crate::{Error, Result};
use tracing::{debug, info, warn};

impl<H> Engine<H> {
    /// Find a partner for `id`, or enqueue it
    ///
    /// Emits `paired` to both members on a match (the member that was already
    /// waiting is the initiator) or `waiting` to `id` otherwise.
    ///
    /// # Errors
    ///
    /// `AlreadyPaired` if `id` is in a session and the re-seek policy is
    /// `Reject`. With `Replace` the old session is torn down first and the
    /// abandoned partner is told `skipped`.
    pub fn request_pairing(&mut self, id: ConnectionId) -> Result<Vec<Delivery>> {
        self.ensure_registered(id)?;

        let mut deliveries = Vec::new();

        if let Some(session_id) = self.sessions.lookup(id).map(Session::id) {
            match self.config.reseek {
                ReseekPolicy::Reject => return Err(Error::AlreadyPaired(session_id)),
                ReseekPolicy::Replace => {
                    debug!(connection_id = %id, session_id = %session_id, "Re-seek replaces session");
                    deliveries.extend(self.teardown(id, TeardownReason::Skipped));
                }
            }
        }

        deliveries.extend(self.match_or_enqueue(id)?);
        Ok(deliveries)
    }

    /// Tear down the session `id` belongs to
    ///
    /// Both index entries go away, the partner (if still connected) receives
    /// `partner-left(reason)`, and the session with its history is dropped.
    /// Calling this for an id with no session is a no-op.
    pub fn teardown(&mut self, id: ConnectionId, reason: TeardownReason) -> Vec<Delivery> {
        let Some(session) = self.sessions.remove_by_member(id) else {
            debug!(connection_id = %id, reason = ?reason, "Teardown with no session");
            return Vec::new();
        };

        let mut deliveries = Vec::new();
        if let Some(partner) = session.partner_of(id) {
            if self.connections.contains(partner) {
                deliveries.push(Delivery::new(partner, OutboundEvent::PartnerLeft { reason }));
            }
        }

        info!(
            session_id = %session.id(),
            connection_id = %id,
            reason = ?reason,
            messages = session.messages().len(),
            duration_ms = current_timestamp_ms().saturating_sub(session.created_at()),
            "Session torn down"
        );

        deliveries
    }

    /// Leave the current session, or stop waiting
    ///
    /// Leaving with nothing to leave is a no-op.
    pub fn leave_session(&mut self, id: ConnectionId) -> Result<Vec<Delivery>> {
        self.ensure_registered(id)?;

        if self.pool.remove(id) {
            info!(connection_id = %id, "Stopped waiting for a partner");
            return Ok(Vec::new());
        }

        if !self.sessions.is_paired(id) {
            debug!(connection_id = %id, "leave-session with no session or wait");
            return Ok(Vec::new());
        }

        Ok(self.teardown(id, TeardownReason::LeftVoluntarily))
    }

    /// Drop the current partner and search again
    ///
    /// The skipped partner is told `partner-left(skipped)` and is not put back
    /// in the pool; it seeks again on its own.
    pub fn skip_partner(&mut self, id: ConnectionId) -> Result<Vec<Delivery>> {
        self.ensure_registered(id)?;

        if !self.sessions.is_paired(id) {
            return Err(Error::NoActiveSession(id));
        }

        let mut deliveries = self.teardown(id, TeardownReason::Skipped);
        deliveries.extend(self.match_or_enqueue(id)?);
        Ok(deliveries)
    }

    /// Pair `id` with another waiting connection, or enqueue it
    ///
    /// `id` must not be in a session.
    fn match_or_enqueue(&mut self, id: ConnectionId) -> Result<Vec<Delivery>> {
        while let Some(partner) = self.pool.dequeue_arbitrary_other(id) {
            if !self.connections.contains(partner) || self.sessions.is_paired(partner) {
                warn!(connection_id = %partner, "Discarding stale waiting entry");
                continue;
            }

            // `id` may have been waiting already (repeated seek)
            self.pool.remove(id);
            return self.create_session(partner, id);
        }

        if self.pool.enqueue(id) {
            info!(connection_id = %id, waiting = self.pool.len(), "Waiting for a partner");
        } else {
            debug!(connection_id = %id, "Already waiting");
        }

        Ok(vec![Delivery::new(id, OutboundEvent::Waiting)])
    }

    /// Bind two connections into a new session and announce it to both
    fn create_session(
        &mut self,
        initiator: ConnectionId,
        responder: ConnectionId,
    ) -> Result<Vec<Delivery>> {
        let session_id: SessionId = self.sessions.insert(Session::new(initiator, responder))?;
        self.sessions_created += 1;

        info!(
            session_id = %session_id,
            initiator = %initiator,
            responder = %responder,
            active_sessions = self.sessions.len(),
            "Session created"
        );

        Ok(vec![
            Delivery::new(
                initiator,
                OutboundEvent::Paired {
                    session_id,
                    initiator: true,
                    partner_nickname: self.nickname_of(responder),
                },
            ),
            Delivery::new(
                responder,
                OutboundEvent::Paired {
                    session_id,
                    initiator: false,
                    partner_nickname: self.nickname_of(initiator),
                },
            ),
        ])
    }
}
