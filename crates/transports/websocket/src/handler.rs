//! WebSocket message handler for JSON-RPC 2.0 requests
//!
//! Handles individual WebSocket connections. Each socket is one engine
//! connection: it is registered on open and disconnected on close, whatever
//! the reason for the close.

use crate::protocol::{
    error_codes, parse_request, ClientRequest, JsonRpcError, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, JSONRPC_VERSION,
};
use crate::{Error, Result};
use futures_util::{SinkExt, StreamExt};
use rendezvous_core::{
    ConnectionId, EngineConfig, EventSink, EventSinkError, MatchmakingHub, OutboundEvent,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Message, Result as WsResult},
};
use tracing::{debug, error, info, warn};

/// Outbound side of one socket as seen by the engine
///
/// Events are serialized to JSON-RPC notifications and queued for the
/// connection's writer task. Never blocks.
pub struct WsSink {
    tx: mpsc::UnboundedSender<String>,
}

impl WsSink {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { tx }
    }
}

impl EventSink for WsSink {
    fn deliver(&self, event: OutboundEvent) -> std::result::Result<(), EventSinkError> {
        let json = JsonRpcNotification::from_event(&event)
            .and_then(|notification| notification.to_json())
            .map_err(|e| EventSinkError::Serialization(e.to_string()))?;

        self.tx.send(json).map_err(|_| EventSinkError::Closed)
    }
}

/// Shared state across all WebSocket connections
pub struct SharedState {
    pub hub: MatchmakingHub<WsSink>,
}

impl SharedState {
    /// Create shared state with a fresh engine
    pub fn new(engine: EngineConfig) -> Result<Self> {
        let hub = MatchmakingHub::new(engine)?;
        Ok(Self { hub })
    }
}

/// Handle a single WebSocket connection
pub async fn handle_connection(stream: TcpStream, state: Arc<SharedState>) -> WsResult<()> {
    let addr = stream.peer_addr()?;
    debug!("WebSocket handshake with {}", addr);

    let ws_stream = accept_async(stream).await?;

    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    // Channel for sending messages back to this connection
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let connection_id = match state.hub.connect(WsSink::new(tx.clone())) {
        Ok(id) => id,
        Err(e) => {
            warn!(peer_addr = %addr, error = %e, "Refusing WebSocket connection");
            let refusal = JsonRpcError::new(
                error_codes::CONNECTION_LIMIT_EXCEEDED,
                e.to_string(),
                Value::Null,
            );
            if let Ok(json) = refusal.to_json() {
                let _ = ws_tx.send(Message::Text(json)).await;
            }
            let _ = ws_tx.close().await;
            return Ok(());
        }
    };

    info!(connection_id = %connection_id, peer_addr = %addr, "WebSocket client connected");

    // Task to forward messages from channel to WebSocket
    let forward_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = ws_tx.send(Message::Text(msg)).await {
                error!("Failed to send WebSocket message: {}", e);
                break;
            }
        }
    });

    // Process incoming messages
    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if let Err(e) = handle_message(&text, &state, connection_id, &tx) {
                    error!(connection_id = %connection_id, error = %e, "Error handling message");
                    if matches!(e, Error::ConnectionClosed) {
                        break;
                    }
                    let error_response =
                        JsonRpcError::new(error_codes::INTERNAL_ERROR, e.to_string(), Value::Null);
                    if let Ok(json) = error_response.to_json() {
                        let _ = tx.send(json);
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                let error_response = JsonRpcError::new(
                    error_codes::INVALID_REQUEST,
                    "Binary frames are not supported".to_string(),
                    Value::Null,
                );
                if let Ok(json) = error_response.to_json() {
                    let _ = tx.send(json);
                }
            }
            Ok(Message::Close(_)) => {
                info!(connection_id = %connection_id, "WebSocket connection closed by client");
                break;
            }
            Err(e) => {
                warn!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
            // Pings are answered by tungstenite, which flushes the Pong on the next read or write
            _ => {}
        }
    }

    // Partner (if any) hears `partner-left(disconnected)` from here
    let delivered = state.hub.disconnect(connection_id);
    debug!(connection_id = %connection_id, delivered, "Connection cleaned up");

    forward_task.abort();

    Ok(())
}

/// Handle one JSON-RPC message
///
/// Protocol failures are answered with a JSON-RPC error. Engine failures
/// arrive as `error` notifications through the connection's sink.
fn handle_message(
    text: &str,
    state: &SharedState,
    connection_id: ConnectionId,
    tx: &mpsc::UnboundedSender<String>,
) -> Result<()> {
    let send = |json: String| tx.send(json).map_err(|_| Error::ConnectionClosed);

    // Only malformed JSON is a parse error; well-formed JSON that is not a
    // request is an invalid request
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            let error = JsonRpcError::new(error_codes::PARSE_ERROR, e.to_string(), Value::Null);
            return send(error.to_json()?);
        }
    };

    let id = value.get("id").cloned().unwrap_or(Value::Null);
    let request = match JsonRpcRequest::from_value(value) {
        Ok(request) => request,
        Err(e) => {
            let error = JsonRpcError::new(error_codes::INVALID_REQUEST, e.to_string(), id);
            return send(error.to_json()?);
        }
    };

    let request_id = request.id.clone().unwrap_or(Value::Null);

    if request.jsonrpc != JSONRPC_VERSION {
        let error = JsonRpcError::new(
            error_codes::INVALID_REQUEST,
            format!("Unsupported jsonrpc version: {}", request.jsonrpc),
            request_id,
        );
        return send(error.to_json()?);
    }

    let client_request = match parse_request(&request.method, request.params) {
        Ok(client_request) => client_request,
        Err(e) => {
            debug!(connection_id = %connection_id, method = %request.method, error = %e, "Rejected request");
            let error = JsonRpcError::new(e.code(), e.to_string(), request_id);
            return send(error.to_json()?);
        }
    };

    match client_request {
        ClientRequest::Stats => {
            let stats = state.hub.stats();
            let result = serde_json::to_value(stats)
                .map_err(|e| Error::SerializationError(e.to_string()))?;
            send(JsonRpcResponse::new(result, request_id).to_json()?)
        }
        ClientRequest::Event(event) => {
            state.hub.dispatch(connection_id, event);

            // Requests with an id get an ack after the events they caused
            if request.id.is_some() {
                send(JsonRpcResponse::new(json!({"accepted": true}), request_id).to_json()?)?;
            }
            Ok(())
        }
    }
}
