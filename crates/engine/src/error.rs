//! Error types for the pairing engine

use crate::connection::ConnectionId;
use crate::events::ErrorKind;
use crate::session::SessionId;

/// Result type alias using the engine Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in pairing and relay operations
///
/// None of these are fatal to the process. Each one is scoped to a single
/// connection and leaves the pool/session invariants intact.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// `seek-partner` while already a member of a session
    #[error("Already paired in session {0}")]
    AlreadyPaired(SessionId),

    /// Signal, message or skip from a connection that has no session
    #[error("No active session for connection {0}")]
    NoActiveSession(ConnectionId),

    /// Operation referenced a connection that is not registered
    #[error("Unknown connection: {0}")]
    UnknownConnection(ConnectionId),

    /// Nickname rejected (empty or too long)
    #[error("Invalid nickname: {0}")]
    InvalidNickname(String),

    /// Connection registry is full
    #[error("Connection limit reached ({0})")]
    CapacityExceeded(usize),

    /// Invalid configuration parameter
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Wire-level kind reported in `error` events
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::AlreadyPaired(_) => ErrorKind::AlreadyPaired,
            Error::NoActiveSession(_) => ErrorKind::NoActiveSession,
            Error::UnknownConnection(_) => ErrorKind::UnknownConnection,
            Error::InvalidNickname(_) => ErrorKind::InvalidNickname,
            Error::CapacityExceeded(_) => ErrorKind::CapacityExceeded,
            Error::InvalidConfig(_) => ErrorKind::Internal,
        }
    }

    /// Whether this error should be reported back to the originating client.
    ///
    /// `UnknownConnection` means the client raced its own disconnect, so there
    /// is nobody left to tell.
    pub fn is_client_visible(&self) -> bool {
        !matches!(self, Error::UnknownConnection(_) | Error::InvalidConfig(_))
    }
}
