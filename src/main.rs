//! HTTP/1.1 server binary.
//!
//! ```text
//!  client ──TCP──▶ net::listener ──▶ net::connection (keep-alive loop)
//!                                          │
//!                                          ▼
//!                       http::request (parse) ──▶ http::middleware
//!                                                  version → method
//!                                                  → compression
//!                                                  → routing → handlers
//!                                          │
//!  client ◀──TCP── http::response (serialize) ◀────┘
//! ```

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use http_server_core::config::{load_config, validate_config, ServerConfig};
use http_server_core::lifecycle::shutdown::trigger_on_ctrl_c;
use http_server_core::net::Listener;
use http_server_core::observability::{logging, metrics};
use http_server_core::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "http-server-core")]
#[command(about = "A minimal HTTP/1.1 server", long_about = None)]
struct Cli {
    /// Directory served under /files/. Without it, /files/ requests get 400.
    #[arg(long)]
    directory: Option<PathBuf>,

    /// Port to listen on (all interfaces). Overrides the config file.
    #[arg(short, long)]
    port: Option<u16>,

    /// Optional TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log output format. Overrides the config file.
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

impl Cli {
    fn into_config(self) -> Result<ServerConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ServerConfig::default(),
        };

        if let Some(directory) = self.directory {
            config.files.directory = Some(directory);
        }
        if let Some(port) = self.port {
            config.listener.bind_address = format!("0.0.0.0:{port}");
        }
        if let Some(format) = self.log_format {
            config.observability.json_logs = matches!(format, LogFormat::Json);
        }

        validate_config(&config).map_err(|errors| {
            errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        })?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;

    logging::init(&config.observability);
    tracing::info!("http-server-core v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        directory = ?config.files.directory,
        max_connections = config.listener.max_connections,
        idle_read_secs = config.timeouts.idle_read_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = Listener::bind(&config.listener).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        if let Err(e) = trigger_on_ctrl_c(&shutdown).await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        }
    });

    HttpServer::new(config).run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
