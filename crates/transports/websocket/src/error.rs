//! Error types for the WebSocket transport

/// Result type alias using the transport Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while serving WebSocket clients
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration parameter
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Pairing engine rejected an operation
    #[error(transparent)]
    Engine(#[from] rendezvous_core::Error),

    /// WebSocket protocol error
    #[error("WebSocket error: {0}")]
    WebSocketError(#[from] tokio_tungstenite::tungstenite::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Outbound queue for a connection is gone
    #[error("Connection closed")]
    ConnectionClosed,

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl Error {
    /// Check if this error is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidConfig(_) | Error::Engine(rendezvous_core::Error::InvalidConfig(_))
        )
    }

    /// Check if this error only affects a single connection
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Error::WebSocketError(_) | Error::ConnectionClosed | Error::SerializationError(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidConfig("test".to_string());
        assert_eq!(err.to_string(), "Invalid configuration: test");
    }

    #[test]
    fn test_engine_error_is_transparent() {
        let err = Error::from(rendezvous_core::Error::CapacityExceeded(4));
        assert_eq!(err.to_string(), "Connection limit reached (4)");
    }

    #[test]
    fn test_error_is_config_error() {
        assert!(Error::InvalidConfig("test".to_string()).is_config_error());
        assert!(Error::from(rendezvous_core::Error::InvalidConfig("x".to_string())).is_config_error());
        assert!(!Error::ConnectionClosed.is_config_error());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::IoError(_)));
        assert!(!err.is_connection_error());
    }
}
