//! Configuration types for the WebSocket transport

use crate::{Error, Result};
use rendezvous_core::EngineConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Main configuration for WebSocketSignalingServer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSocketServerConfig {
    /// Address to listen on (default: 0.0.0.0:8080, port 0 picks a free port)
    pub bind_address: String,

    /// Pairing engine configuration
    pub engine: EngineConfig,
}

impl Default for WebSocketServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            engine: EngineConfig::default(),
        }
    }
}

impl WebSocketServerConfig {
    /// Validate configuration parameters
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `bind_address` is not a socket address
    /// - the engine configuration is invalid
    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;
        self.engine.validate()?;
        Ok(())
    }

    /// Parsed listen address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_address.parse().map_err(|e| {
            Error::InvalidConfig(format!(
                "bind_address '{}' is not a socket address: {}",
                self.bind_address, e
            ))
        })
    }

    /// Builder: set the listen address
    pub fn with_bind_address(mut self, bind_address: impl Into<String>) -> Self {
        self.bind_address = bind_address.into();
        self
    }

    /// Builder: set the engine configuration
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = WebSocketServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.socket_addr().unwrap().port(), 8080);
    }

    #[test]
    fn test_invalid_bind_address() {
        let config = WebSocketServerConfig::default().with_bind_address("localhost");
        let err = config.validate().unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_invalid_engine_config() {
        let config = WebSocketServerConfig::default()
            .with_engine(EngineConfig::default().with_max_connections(0));
        assert!(config.validate().unwrap_err().is_config_error());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: WebSocketServerConfig =
            serde_json::from_str(r#"{"bind_address": "127.0.0.1:0", "engine": {"reseek": "replace"}}"#)
                .unwrap();
        assert_eq!(config.bind_address, "127.0.0.1:0");
        assert_eq!(config.engine.reseek, rendezvous_core::ReseekPolicy::Replace);
        assert_eq!(config.engine.max_connections, 10_000);
    }
}
