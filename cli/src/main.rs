//! opmetrics: CLI server
//!
//! ```sh
//! # Run with default config ($OPMETRICS_CONFIG or ~/.config/opmetrics/config.toml)
//! opmetrics-service
//!
//! # Custom config path
//! opmetrics-service --config /etc/opmetrics/config.toml
//!
//! # Override port and log level
//! opmetrics-service --api-port 9100 --log-level debug
//!
//! # Validate config without starting
//! opmetrics-service --check
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use opmetrics::config::{AppConfig, CONFIG_ENV};
use opmetrics::server::{init_tracing, ServerHandle, ServerOptions};

/// Operation metrics collection service.
#[derive(Parser, Debug)]
#[command(
    name = "opmetrics-service",
    version,
    about = "Collects, filters, aggregates and exports operation metrics",
    long_about = "REST API server that stores timed operation records per project \
                  and serves filtered, aggregated, charted and exported views of them.\n\n\
                  Default config: ~/.config/opmetrics/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Override the REST API listen port.
    #[arg(long)]
    api_port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Validate the configuration file and exit without starting the server.
    #[arg(long)]
    check: bool,
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(opmetrics::default_config_path);

    let loaded = AppConfig::load(&config_path);
    if cli.check {
        return match loaded {
            Ok(config) => {
                println!("✅ Configuration is valid");
                println!("   Config file : {}", config_path.display());
                println!("   API address : {}", config.api_address());
                println!("   Database    : {}", config.database.url);
                println!("   Auth        : {}", on_off(config.security.auth_enabled));
                println!("   Docs        : {}", on_off(config.docs.enabled));
                println!("   Telemetry   : {}", on_off(config.telemetry.enabled));
                println!("   Suggestions : {}", on_off(config.completion_config().is_some()));
                println!("   Log level   : {}", config.logging.level);
                Ok(())
            }
            Err(e) => {
                eprintln!("❌ Invalid configuration in {}: {}", config_path.display(), e);
                std::process::exit(1);
            }
        };
    }

    let mut config = match loaded {
        Ok(mut cfg) => {
            if let Some(ref level) = cli.log_level {
                cfg.logging.level = level.clone();
            }
            init_tracing(&cfg);
            info!("Configuration loaded from {}", config_path.display());
            cfg
        }
        Err(e) => {
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::new(
                    cli.log_level.as_deref().unwrap_or("info"),
                ))
                .init();
            error!("Failed to load config from {}: {}", config_path.display(), e);
            error!("Using default configuration.");
            AppConfig::default()
        }
    };

    if let Some(port) = cli.api_port {
        info!("CLI override: api_port = {}", port);
        config.server.api_port = port;
    }

    let handle = ServerHandle::start(ServerOptions { config }).await?;
    handle.install_signal_handler();

    info!("🚀 Press Ctrl+C to shutdown gracefully.");

    handle.shutdown_signal().wait().await;
    handle.wait().await;

    Ok(())
}
