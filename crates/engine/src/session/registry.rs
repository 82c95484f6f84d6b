//! Session registry
//!
//! Owns every active [`Session`] and an eager index from member id to session
//! id, so "which session am I in" is a single hash lookup.

use super::{Session, SessionId};
use crate::connection::ConnectionId;
use crate::{Error, Result};
use std::collections::HashMap;

/// Active sessions plus the member index
#[derive(Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
    index: HashMap<ConnectionId, SessionId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a session and index both members
    ///
    /// # Errors
    ///
    /// Returns `AlreadyPaired` if either member is already indexed. Nothing is
    /// inserted in that case.
    pub fn insert(&mut self, session: Session) -> Result<SessionId> {
        for member in session.members() {
            if let Some(existing) = self.index.get(&member) {
                return Err(Error::AlreadyPaired(*existing));
            }
        }

        let session_id = session.id();
        for member in session.members() {
            self.index.insert(member, session_id);
        }
        self.sessions.insert(session_id, session);

        Ok(session_id)
    }

    /// Session `id` currently belongs to
    pub fn lookup(&self, id: ConnectionId) -> Option<&Session> {
        let session_id = self.index.get(&id)?;
        self.sessions.get(session_id)
    }

    pub fn lookup_mut(&mut self, id: ConnectionId) -> Option<&mut Session> {
        let session_id = self.index.get(&id)?;
        self.sessions.get_mut(session_id)
    }

    /// Session by its own id
    pub fn get(&self, session_id: SessionId) -> Option<&Session> {
        self.sessions.get(&session_id)
    }

    pub fn is_paired(&self, id: ConnectionId) -> bool {
        self.index.contains_key(&id)
    }

    /// Detach the session `id` belongs to, removing both index entries
    ///
    /// Returns `None` when `id` is not in a session, which makes repeated
    /// teardowns harmless.
    pub fn remove_by_member(&mut self, id: ConnectionId) -> Option<Session> {
        let session_id = self.index.remove(&id)?;
        let session = self.sessions.remove(&session_id)?;

        for member in session.members() {
            self.index.remove(&member);
        }

        Some(session)
    }

    /// Number of active sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Number of indexed members (always twice the session count)
    pub fn indexed_members(&self) -> usize {
        self.index.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u64) -> ConnectionId {
        ConnectionId::new(raw)
    }

    #[test]
    fn test_insert_indexes_both_members() {
        let mut registry = SessionRegistry::new();
        let session_id = registry.insert(Session::new(id(1), id(2))).unwrap();

        assert_eq!(registry.lookup(id(1)).map(Session::id), Some(session_id));
        assert_eq!(registry.lookup(id(2)).map(Session::id), Some(session_id));
        assert!(registry.lookup(id(3)).is_none());
        assert_eq!(registry.indexed_members(), 2);
    }

    #[test]
    fn test_member_cannot_join_two_sessions() {
        let mut registry = SessionRegistry::new();
        let first = registry.insert(Session::new(id(1), id(2))).unwrap();

        let err = registry.insert(Session::new(id(2), id(3))).unwrap_err();
        assert_eq!(err, Error::AlreadyPaired(first));

        // The rejected session left no trace
        assert_eq!(registry.len(), 1);
        assert!(!registry.is_paired(id(3)));
    }

    #[test]
    fn test_remove_by_member_is_idempotent() {
        let mut registry = SessionRegistry::new();
        registry.insert(Session::new(id(1), id(2))).unwrap();

        let removed = registry.remove_by_member(id(2)).unwrap();
        assert_eq!(removed.members(), [id(1), id(2)]);
        assert!(registry.is_empty());
        assert_eq!(registry.indexed_members(), 0);

        assert!(registry.remove_by_member(id(1)).is_none());
        assert!(registry.remove_by_member(id(2)).is_none());
    }
}
