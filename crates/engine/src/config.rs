//! Configuration types for the pairing engine

use serde::{Deserialize, Serialize};

/// Main configuration for the pairing engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How a partner is chosen from the waiting pool (default: Fifo)
    pub selection: SelectionStrategy,

    /// Seed for the random strategy (entropy if None)
    pub selection_seed: Option<u64>,

    /// Behaviour of `seek-partner` while already paired (default: Reject)
    pub reseek: ReseekPolicy,

    /// Also deliver `new-message` to the sender (default: true)
    pub echo_messages_to_sender: bool,

    /// Name reported for partners that never set one (default: "Stranger")
    pub default_nickname: String,

    /// Maximum nickname length in characters (default: 32)
    pub max_nickname_len: usize,

    /// Maximum simultaneous connections (default: 10000)
    pub max_connections: usize,
}

/// Partner selection strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionStrategy {
    /// Longest-waiting connection first
    Fifo,
    /// Any waiting connection, uniformly
    Random,
}

/// What to do when a paired connection asks for a new partner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReseekPolicy {
    /// Fail with `AlreadyPaired`; the client must leave first
    Reject,
    /// Tear the current session down (partner sees `skipped`), then search
    Replace,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            selection: SelectionStrategy::Fifo,
            selection_seed: None,
            reseek: ReseekPolicy::Reject,
            echo_messages_to_sender: true,
            default_nickname: "Stranger".to_string(),
            max_nickname_len: 32,
            max_connections: 10_000,
        }
    }
}

impl EngineConfig {
    /// Validate configuration parameters
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `max_connections` is 0
    /// - `max_nickname_len` is 0
    /// - `default_nickname` is empty or longer than `max_nickname_len`
    pub fn validate(&self) -> crate::Result<()> {
        use crate::Error;

        if self.max_connections == 0 {
            return Err(Error::InvalidConfig(
                "max_connections must be greater than 0".to_string(),
            ));
        }

        if self.max_nickname_len == 0 {
            return Err(Error::InvalidConfig(
                "max_nickname_len must be greater than 0".to_string(),
            ));
        }

        let default_len = self.default_nickname.trim().chars().count();
        if default_len == 0 || default_len > self.max_nickname_len {
            return Err(Error::InvalidConfig(format!(
                "default_nickname must be 1-{} characters, got {:?}",
                self.max_nickname_len, self.default_nickname
            )));
        }

        Ok(())
    }

    /// Set the selection strategy
    pub fn with_selection(mut self, selection: SelectionStrategy) -> Self {
        self.selection = selection;
        self
    }

    /// Seed the random selection strategy
    pub fn with_selection_seed(mut self, seed: u64) -> Self {
        self.selection_seed = Some(seed);
        self
    }

    /// Set the re-seek policy
    pub fn with_reseek(mut self, reseek: ReseekPolicy) -> Self {
        self.reseek = reseek;
        self
    }

    /// Set the connection limit
    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Enable or disable echoing chat messages to their sender
    pub fn with_echo_messages(mut self, echo: bool) -> Self {
        self.echo_messages_to_sender = echo;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.selection, SelectionStrategy::Fifo);
        assert_eq!(config.reseek, ReseekPolicy::Reject);
    }

    #[test]
    fn test_zero_max_connections_fails() {
        let config = EngineConfig::default().with_max_connections(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_nickname_bounds() {
        let mut config = EngineConfig::default();
        config.default_nickname = "   ".to_string();
        assert!(config.validate().is_err());

        config.default_nickname = "x".repeat(33);
        assert!(config.validate().is_err());

        config.max_nickname_len = 40;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_deserialization() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"selection": "random", "reseek": "replace"}"#).unwrap();
        assert_eq!(config.selection, SelectionStrategy::Random);
        assert_eq!(config.reseek, ReseekPolicy::Replace);
        assert_eq!(config.max_connections, 10_000);
    }

    #[test]
    fn test_builder_chain() {
        let config = EngineConfig::default()
            .with_selection(SelectionStrategy::Random)
            .with_selection_seed(9)
            .with_echo_messages(false);
        assert!(config.validate().is_ok());
        assert_eq!(config.selection_seed, Some(9));
        assert!(!config.echo_messages_to_sender);
    }
}
