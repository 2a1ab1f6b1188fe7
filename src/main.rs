//! TickRelay Server: real-time tick data relay
//!
//! Main entry point: parses arguments, loads configuration, initializes
//! logging, and runs the server until a shutdown signal arrives.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use tickrelay_core::config::AppConfig;
use tickrelay_core::AppResult;

/// TickRelay fans producer price updates out to WebSocket subscribers
#[derive(Debug, Parser)]
#[command(name = "tickrelay-server", version, about, long_about = None)]
struct Args {
    /// Directory holding `default.toml` and `{env}.toml`
    #[arg(long, env = "TICKRELAY_CONFIG_DIR", default_value = "config")]
    config_dir: String,

    /// Environment overlay to load from the config directory
    #[arg(long, env = "TICKRELAY_ENV", default_value = "development")]
    env: String,

    /// Override `server.host`
    #[arg(long)]
    host: Option<String>,

    /// Override `server.port`
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match load_configuration(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(
        config_dir = %args.config_dir,
        env = %args.env,
        "Configuration loaded"
    );

    if let Err(e) = tickrelay_api::run_server(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from files and environment, then apply CLI overrides
fn load_configuration(args: &Args) -> AppResult<AppConfig> {
    let mut config = AppConfig::load(&args.config_dir, &args.env)?;

    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    Ok(config)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}
