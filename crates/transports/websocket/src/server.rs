//! WebSocket signaling server
//!
//! Accepts WebSocket clients and binds each one to the shared pairing engine.
//! The accept loop runs as a tokio task until the returned handle is shut
//! down.

use crate::config::WebSocketServerConfig;
use crate::handler::{handle_connection, SharedState};
use crate::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// WebSocket signaling server
pub struct WebSocketSignalingServer {
    /// Server address
    addr: SocketAddr,

    /// Shared state
    state: Arc<SharedState>,
}

impl WebSocketSignalingServer {
    /// Create a new server from a validated configuration
    pub fn new(config: WebSocketServerConfig) -> Result<Self> {
        config.validate()?;

        let addr = config.socket_addr()?;
        let state = Arc::new(SharedState::new(config.engine)?);

        Ok(Self { addr, state })
    }

    /// Get shared state (for external access)
    pub fn state(&self) -> Arc<SharedState> {
        Arc::clone(&self.state)
    }

    /// Get the configured address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Bind the listener and start accepting connections
    ///
    /// Returns once the socket is bound. The handle reports the actual local
    /// address, which matters when the configured port is 0.
    pub async fn start(self) -> Result<WebSocketServerHandle> {
        let listener = TcpListener::bind(self.addr).await.map_err(|e| {
            error!("Failed to bind WebSocket server to {}: {}", self.addr, e);
            e
        })?;
        let local_addr = listener.local_addr()?;

        info!(
            "WebSocket signaling server bound and listening on ws://{}",
            local_addr
        );

        // Shutdown channel
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);
        let state = Arc::clone(&self.state);

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, peer_addr)) => {
                                info!("Accepted WebSocket connection from {}", peer_addr);
                                let state_clone = Arc::clone(&state);
                                tokio::spawn(async move {
                                    if let Err(e) = handle_connection(stream, state_clone).await {
                                        error!("WebSocket connection error from {}: {}", peer_addr, e);
                                    }
                                });
                            }
                            Err(e) => {
                                error!("Failed to accept WebSocket connection: {}", e);
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("WebSocket signaling server received shutdown signal");
                        break;
                    }
                }
            }

            info!("WebSocket signaling server accept loop exited");
        });

        Ok(WebSocketServerHandle {
            local_addr,
            state: Arc::clone(&self.state),
            task: Some(task),
            shutdown_tx,
        })
    }
}

/// Handle for controlling the WebSocket server
pub struct WebSocketServerHandle {
    local_addr: SocketAddr,
    state: Arc<SharedState>,
    task: Option<JoinHandle<()>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl WebSocketServerHandle {
    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Shared state of the running server
    pub fn state(&self) -> Arc<SharedState> {
        Arc::clone(&self.state)
    }

    /// Stop accepting connections
    ///
    /// Connections already open keep being served until they close.
    pub async fn shutdown(mut self) {
        info!("Sending shutdown signal to WebSocket server");
        let _ = self.shutdown_tx.send(());

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!("WebSocket accept loop ended abnormally: {}", e);
            }
        }
    }
}
