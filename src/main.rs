//! upstream-balancer
//!
//! ```text
//!     Client ──▶ listener :8000 ──▶ Balancer::route ──▶ ServerPool::next ──▶ Upstream::forward ──▶ Backend
//!     Client ◀──────────────────────────────────────────── relayed response ◀──────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::net::TcpListener;

use upstream_balancer::config::{read_config, BalancerConfig, ConfigError, UpstreamConfig};
use upstream_balancer::lifecycle::{signals, Shutdown};
use upstream_balancer::observability::logging;
use upstream_balancer::HttpServer;

#[derive(Parser, Debug)]
#[command(
    name = "upstream-balancer",
    version,
    about = "Round-robin HTTP load balancer",
    after_help = "No upstreams are built in. Start with `--config balancer.toml` for the \
                  bundled three-upstream setup on port 8000, or pass `--upstream` one or more times."
)]
struct Cli {
    /// TOML configuration file (the bundled balancer.toml lists three upstreams).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Port to listen on (default 8000).
    #[arg(short, long)]
    port: Option<u16>,

    /// Upstream base URI. Repeat to list several; replaces upstreams from the file.
    #[arg(short = 'u', long = "upstream", value_name = "URL")]
    upstreams: Vec<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn into_config(self) -> Result<BalancerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => BalancerConfig::default(),
        };

        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if !self.upstreams.is_empty() {
            config.upstreams = self.upstreams.into_iter().map(UpstreamConfig::new).collect();
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = cli.into_config()?;

    logging::init(&config.observability.log_level);
    tracing::info!("upstream-balancer v{} starting", env!("CARGO_PKG_VERSION"));

    let bind_address = config.listener.bind_address();
    let server = HttpServer::new(config)?;

    let listener = TcpListener::bind(&bind_address).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::shutdown_signal().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
