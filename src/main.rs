//! Flow forwarder
//!
//! An HTTP forwarding layer that sits between clients and an origin server.
//!
//! # Architecture Overview
//!
//! ```text
//!                           ┌──────────────────────────────────────────────────┐
//!                           │                 FLOW FORWARDER                   │
//!                           │ ┌─────────┐    ┌─────────────┐                   │
//!    Client ────────────────┼▶│  http   │───▶│ interceptor │                   │
//!                           │ │ server  │    │  (classify) │                   │
//!                           │ └─────────┘    └──┬───────┬──┘                   │
//!                           │    x-source =     │       │  otherwise           │
//!                           │ connector-service │       │  strip x-request-id  │
//!                           │                   ▼       ▼                      │
//!                           │          ┌───────────┐ ┌──────────┐              │
//!                           │          │ connector │ │  store   │              │
//!                           │          │ (suspend) │ └────┬─────┘              │
//!                           │          └─────┬─────┘      │ forward            ├──▶ Origin
//!                           │                │            ▼                    │
//!                           │                │      response hook              │
//!                           │                │   restore + x-state marker      │
//!                           │                │            │                    │
//!                           │                ▼            ▼                    │
//!                           │        Forward target ◀── reporting (async)      │
//!                           └──────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use flow_forwarder::config::validation::validate_config;
use flow_forwarder::config::{load_config, ConfigError, ForwarderConfig};
use flow_forwarder::lifecycle::signals::wait_for_signal;
use flow_forwarder::observability::{logging, metrics};
use flow_forwarder::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "flow-forwarder")]
#[command(about = "HTTP forwarding layer with connector delegation and enrichment reporting", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(long)]
    bind: Option<String>,

    /// Override forward.url.
    #[arg(long)]
    forward_url: Option<String>,

    /// Override upstream.origin.
    #[arg(long)]
    origin: Option<String>,
}

impl Cli {
    fn into_config(self) -> Result<ForwarderConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ForwarderConfig::default(),
        };
        if let Some(bind) = self.bind {
            config.listener.bind_address = bind;
        }
        if let Some(url) = self.forward_url {
            config.forward.url = url;
        }
        if let Some(origin) = self.origin {
            config.upstream.origin = Some(origin);
        }
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;

    logging::init_logging(&config.observability);
    tracing::info!("flow-forwarder v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        forward_url = %config.forward.url,
        forward_timeout_ms = config.forward.timeout_ms,
        origin = ?config.upstream.origin,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
