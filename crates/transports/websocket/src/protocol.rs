//! JSON-RPC 2.0 wire protocol
//!
//! Clients send requests whose `method` is an inbound event name. The server
//! pushes every outbound event as a notification whose `method` is the event
//! name and whose `params` is the event data.

use rendezvous_core::{InboundEvent, OutboundEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC 2.0 protocol version
pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC 2.0 request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcRequest {
    /// Protocol version (must be "2.0")
    pub jsonrpc: String,

    /// Method name to invoke
    pub method: String,

    /// Method parameters
    #[serde(default)]
    pub params: Value,

    /// Request ID for matching with response (optional for notifications)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 response (success)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcResponse {
    /// Protocol version (must be "2.0")
    pub jsonrpc: String,

    /// Result data
    pub result: Value,

    /// Request ID this response corresponds to
    pub id: Value,
}

/// JSON-RPC 2.0 error response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcError {
    /// Protocol version (must be "2.0")
    pub jsonrpc: String,

    /// Error details
    pub error: ErrorObject,

    /// Request ID this error corresponds to
    pub id: Value,
}

/// JSON-RPC 2.0 error object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorObject {
    /// Error code
    pub code: i32,

    /// Human-readable error message
    pub message: String,

    /// Additional error data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// JSON-RPC 2.0 notification pushed by the server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcNotification {
    /// Protocol version (must be "2.0")
    pub jsonrpc: String,

    /// Outbound event name
    pub method: String,

    /// Event data
    pub params: Value,
}

/// Standard JSON-RPC 2.0 error codes
pub mod error_codes {
    /// Invalid JSON was received
    pub const PARSE_ERROR: i32 = -32700;

    /// The JSON sent is not a valid Request object
    pub const INVALID_REQUEST: i32 = -32600;

    /// The method does not exist / is not available
    pub const METHOD_NOT_FOUND: i32 = -32601;

    /// Invalid method parameter(s)
    pub const INVALID_PARAMS: i32 = -32602;

    /// Internal JSON-RPC error
    pub const INTERNAL_ERROR: i32 = -32603;

    /// Server refused the connection because it is full
    pub const CONNECTION_LIMIT_EXCEEDED: i32 = -32005;
}

/// Method name for the server statistics request
pub const STATS_METHOD: &str = "server.stats";

/// Parameters for send-message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SendMessageParams {
    pub body: String,
}

/// Parameters for set-typing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SetTypingParams {
    pub is_typing: bool,
}

/// Parameters for set-nickname
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SetNicknameParams {
    pub nickname: String,
}

/// A decoded client request
#[derive(Debug, Clone, PartialEq)]
pub enum ClientRequest {
    /// Hand to the pairing engine
    Event(InboundEvent),
    /// `server.stats`
    Stats,
}

/// Why a request could not be mapped to a [`ClientRequest`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("Unknown method: {0}")]
    MethodNotFound(String),

    #[error("Invalid params for {method}: {reason}")]
    InvalidParams { method: String, reason: String },
}

impl ProtocolError {
    /// JSON-RPC error code for this failure
    pub fn code(&self) -> i32 {
        match self {
            ProtocolError::MethodNotFound(_) => error_codes::METHOD_NOT_FOUND,
            ProtocolError::InvalidParams { .. } => error_codes::INVALID_PARAMS,
        }
    }
}

/// Map a request method and its params onto a client request
///
/// Signaling params are kept verbatim, whatever their shape.
pub fn parse_request(method: &str, params: Value) -> Result<ClientRequest, ProtocolError> {
    fn typed<T: serde::de::DeserializeOwned>(
        method: &str,
        params: Value,
    ) -> Result<T, ProtocolError> {
        serde_json::from_value(params).map_err(|e| ProtocolError::InvalidParams {
            method: method.to_string(),
            reason: e.to_string(),
        })
    }

    let event = match method {
        STATS_METHOD => return Ok(ClientRequest::Stats),
        "seek-partner" => InboundEvent::SeekPartner,
        "leave-session" => InboundEvent::LeaveSession,
        "skip-partner" => InboundEvent::SkipPartner,
        "signal-offer" => InboundEvent::SignalOffer(params),
        "signal-answer" => InboundEvent::SignalAnswer(params),
        "signal-candidate" => InboundEvent::SignalCandidate(params),
        "send-message" => {
            let SendMessageParams { body } = typed(method, params)?;
            InboundEvent::SendMessage { body }
        }
        "set-typing" => {
            let SetTypingParams { is_typing } = typed(method, params)?;
            InboundEvent::SetTyping { is_typing }
        }
        "set-nickname" => {
            let SetNicknameParams { nickname } = typed(method, params)?;
            InboundEvent::SetNickname { nickname }
        }
        _ => return Err(ProtocolError::MethodNotFound(method.to_string())),
    };

    Ok(ClientRequest::Event(event))
}

impl JsonRpcRequest {
    /// Create a new JSON-RPC request
    pub fn new(method: impl Into<String>, params: Value, id: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id,
        }
    }

    /// Interpret an already parsed JSON value as a request
    pub fn from_value(value: Value) -> crate::Result<Self> {
        serde_json::from_value(value).map_err(|e| {
            crate::Error::SerializationError(format!("Invalid JSON-RPC request: {}", e))
        })
    }
}

impl JsonRpcResponse {
    /// Create a new JSON-RPC response
    pub fn new(result: Value, id: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result,
            id,
        }
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> crate::Result<String> {
        serde_json::to_string(self).map_err(|e| {
            crate::Error::SerializationError(format!(
                "Failed to serialize JSON-RPC response: {}",
                e
            ))
        })
    }
}

impl JsonRpcError {
    /// Create a new JSON-RPC error
    pub fn new(code: i32, message: String, id: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            error: ErrorObject {
                code,
                message,
                data: None,
            },
            id,
        }
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> crate::Result<String> {
        serde_json::to_string(self).map_err(|e| {
            crate::Error::SerializationError(format!("Failed to serialize JSON-RPC error: {}", e))
        })
    }
}

impl JsonRpcNotification {
    /// Wrap an outbound engine event
    ///
    /// `params` is the event's `data`; events without data (`waiting`) get an
    /// empty object.
    pub fn from_event(event: &OutboundEvent) -> crate::Result<Self> {
        let mut tagged = serde_json::to_value(event).map_err(|e| {
            crate::Error::SerializationError(format!("Failed to serialize event: {}", e))
        })?;

        let params = tagged
            .get_mut("data")
            .map(Value::take)
            .unwrap_or_else(|| Value::Object(Default::default()));

        Ok(Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: event.name().to_string(),
            params,
        })
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> crate::Result<String> {
        serde_json::to_string(self).map_err(|e| {
            crate::Error::SerializationError(format!(
                "Failed to serialize JSON-RPC notification: {}",
                e
            ))
        })
    }
}
