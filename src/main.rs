//! genai-relay
//!
//! ```text
//!                    ┌──────────────────────────────────────────────┐
//!   HTTP clients ───▶│ http server ──▶ relay worker ──▶ executor ───┼──▶ generative API
//!                    │      │                ▲             │        │
//!                    │      │           outcomes by id ◀───┘        │
//!                    │      ├──▶ /v1beta/... pass-through ──────────┼──▶ generative API
//!                    │      └──▶ offline asset cache ───────────────┼──▶ static origin
//!                    │                                              │
//!                    │  config (+ watcher)   observability   lifecycle
//!                    └──────────────────────────────────────────────┘
//! ```

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use genai_relay::config::{self, ConfigWatcher, RelayConfig};
use genai_relay::executor::{Executor, HttpTransport, RetryPolicy};
use genai_relay::lifecycle::{self, Shutdown};
use genai_relay::observability::{logging, metrics};
use genai_relay::relay::RelayClient;
use genai_relay::HttpServer;

#[derive(Parser)]
#[command(name = "genai-relay")]
#[command(about = "Relay for generative-AI API calls with retry and backoff", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP relay server
    Serve,
    /// Run a single job and print its JSON result
    Call {
        /// Full API endpoint URL
        #[arg(short, long)]
        endpoint: String,

        /// API credential
        #[arg(short, long, env = "GENAI_API_KEY", default_value = "")]
        key: String,

        /// JSON payload file, or `-` for stdin
        #[arg(short, long, default_value = "-")]
        payload: String,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => RelayConfig::default(),
    };

    logging::init_logging(config.observability.log_format);

    match cli.command {
        Commands::Serve => {
            serve(config, cli.config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Call {
            endpoint,
            key,
            payload,
        } => call(config, endpoint, key, &payload).await,
    }
}

async fn serve(
    config: RelayConfig,
    config_path: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("genai-relay v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_attempts = config.retries.max_attempts,
        base_delay_ms = config.retries.base_delay_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Keep the watcher alive for the lifetime of the server.
    let (config_updates, _watcher) = match &config_path {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (updates, Some(watcher.run()?))
        }
        None => (mpsc::unbounded_channel().1, None),
    };

    let shutdown = Shutdown::new();
    tokio::spawn(lifecycle::trigger_on_signal(shutdown.clone()));

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config, shutdown)?;
    server.run(listener, config_updates).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn call(
    config: RelayConfig,
    endpoint: String,
    key: String,
    payload_source: &str,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let payload: Value = if payload_source == "-" {
        let mut raw = String::new();
        std::io::stdin().read_to_string(&mut raw)?;
        serde_json::from_str(&raw)?
    } else {
        serde_json::from_str(&std::fs::read_to_string(payload_source)?)?
    };

    let transport = HttpTransport::with_header_name(&config.upstream.credential_header)?;
    let executor = Arc::new(Executor::new(transport, RetryPolicy::from(&config.retries)));
    let shutdown = Shutdown::new();
    let relay = RelayClient::connect(executor, shutdown.subscribe());

    let outcome = relay.submit(endpoint, payload, key).await;
    shutdown.trigger();

    match outcome {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}
