//! Rendezvous server binary entry point
//!
//! Pairs anonymous WebSocket clients into two-party sessions and relays their
//! WebRTC signaling and chat traffic.
//!
//! # Usage
//!
//! ```bash
//! # Listen on the default address (0.0.0.0:8080)
//! cargo run -p rendezvous-server
//!
//! # Random partner selection, re-seek replaces the current session
//! cargo run -p rendezvous-server -- \
//!   --bind-address 127.0.0.1:9000 \
//!   --selection random \
//!   --reseek replace
//!
//! # JSON logs at debug level
//! RUST_LOG=debug cargo run -p rendezvous-server -- --log-json
//! ```

use clap::Parser;
use rendezvous_core::{EngineConfig, ReseekPolicy, SelectionStrategy};
use rendezvous_websocket::{WebSocketServerConfig, WebSocketSignalingServer};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Rendezvous Server
///
/// Anonymous pairing and signaling relay over JSON-RPC 2.0 WebSocket.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:8080", env = "RENDEZVOUS_BIND_ADDRESS")]
    bind_address: String,

    /// Partner selection strategy
    #[arg(long, value_enum, default_value = "fifo", env = "RENDEZVOUS_SELECTION")]
    selection: Selection,

    /// Seed for random selection (reproducible pairing order)
    #[arg(long, env = "RENDEZVOUS_SELECTION_SEED")]
    selection_seed: Option<u64>,

    /// What seek-partner does while already paired
    #[arg(long, value_enum, default_value = "reject", env = "RENDEZVOUS_RESEEK")]
    reseek: Reseek,

    /// Maximum simultaneous connections
    #[arg(long, default_value_t = 10_000, env = "RENDEZVOUS_MAX_CONNECTIONS")]
    max_connections: usize,

    /// Name shown for partners that never set one
    #[arg(long, default_value = "Stranger", env = "RENDEZVOUS_DEFAULT_NICKNAME")]
    default_nickname: String,

    /// Deliver new-message back to its sender
    #[arg(
        long,
        default_value_t = true,
        action = clap::ArgAction::Set,
        env = "RENDEZVOUS_ECHO_MESSAGES"
    )]
    echo_messages: bool,

    /// Emit logs as JSON lines
    #[arg(long, default_value_t = false, env = "RENDEZVOUS_LOG_JSON")]
    log_json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum Selection {
    /// Longest-waiting client first
    Fifo,
    /// Any waiting client
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum Reseek {
    /// Fail with already-paired
    Reject,
    /// Leave the current session (partner sees skipped), then search
    Replace,
}

impl Args {
    fn server_config(&self) -> WebSocketServerConfig {
        let mut engine = EngineConfig::default()
            .with_selection(match self.selection {
                Selection::Fifo => SelectionStrategy::Fifo,
                Selection::Random => SelectionStrategy::Random,
            })
            .with_reseek(match self.reseek {
                Reseek::Reject => ReseekPolicy::Reject,
                Reseek::Replace => ReseekPolicy::Replace,
            })
            .with_max_connections(self.max_connections)
            .with_echo_messages(self.echo_messages);
        engine.selection_seed = self.selection_seed;
        engine.default_nickname = self.default_nickname.clone();

        WebSocketServerConfig::default()
            .with_bind_address(self.bind_address.clone())
            .with_engine(engine)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args = Args::parse();

    // Set up Ctrl+C handler at the very start
    let shutdown_flag = Arc::new(AtomicBool::new(false));
    let shutdown_flag_handler = Arc::clone(&shutdown_flag);

    ctrlc::set_handler(move || {
        eprintln!("\nCtrl+C received, initiating shutdown...");

        let was_already_set = shutdown_flag_handler.swap(true, Ordering::SeqCst);
        if was_already_set {
            eprintln!("Shutdown already in progress, forcing immediate exit");
            std::process::exit(0);
        }

        // Give it a moment for graceful shutdown
        std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_secs(3));
            eprintln!("Graceful shutdown timeout (3s), forcing exit");
            std::process::exit(0);
        });
    })
    .expect("Failed to set Ctrl+C handler");

    // Create multi-threaded tokio runtime
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .thread_name("rendezvous-worker")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(args, shutdown_flag))
}

async fn async_main(
    args: Args,
    shutdown_flag: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing (logging)
    init_tracing(args.log_json);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Rendezvous server starting"
    );

    let config = args.server_config();
    config.validate()?;

    info!(
        bind_address = %config.bind_address,
        selection = ?config.engine.selection,
        reseek = ?config.engine.reseek,
        max_connections = config.engine.max_connections,
        echo_messages = config.engine.echo_messages_to_sender,
        "Configuration loaded"
    );

    let server = WebSocketSignalingServer::new(config)?;
    let handle = server.start().await?;
    info!("Server running on ws://{}. Press Ctrl+C to shutdown.", handle.local_addr());

    while !shutdown_flag.load(Ordering::SeqCst) {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    }

    info!("Shutdown signal received, cleaning up...");

    let stats = handle.state().hub.stats();
    handle.shutdown().await;

    info!(
        connections = stats.connections,
        active_sessions = stats.active_sessions,
        sessions_created = stats.sessions_created,
        messages_relayed = stats.messages_relayed,
        "Rendezvous server shut down gracefully"
    );

    Ok(())
}

fn init_tracing(json: bool) {
    // Initialize tracing with EnvFilter for RUST_LOG support
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_build_valid_config() {
        let args = Args::parse_from(["rendezvous-server"]);
        let config = args.server_config();

        assert!(config.validate().is_ok());
        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert_eq!(config.engine.selection, SelectionStrategy::Fifo);
        assert_eq!(config.engine.reseek, ReseekPolicy::Reject);
        assert!(config.engine.echo_messages_to_sender);
    }

    #[test]
    fn test_flags_map_onto_engine_config() {
        let args = Args::parse_from([
            "rendezvous-server",
            "--selection",
            "random",
            "--selection-seed",
            "42",
            "--reseek",
            "replace",
            "--echo-messages",
            "false",
            "--max-connections",
            "16",
        ]);
        let config = args.server_config();

        assert_eq!(config.engine.selection, SelectionStrategy::Random);
        assert_eq!(config.engine.selection_seed, Some(42));
        assert_eq!(config.engine.reseek, ReseekPolicy::Replace);
        assert!(!config.engine.echo_messages_to_sender);
        assert_eq!(config.engine.max_connections, 16);
    }
}
