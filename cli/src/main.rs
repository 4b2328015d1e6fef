//! `evrental-service`: headless reservation, pickup, handover and ledger
//! API for systemd units, containers or a developer shell.
//!
//! ```sh
//! evrental-service                                   # ~/.config/evrental/config.toml
//! evrental-service --config /etc/evrental/config.toml
//! evrental-service --api-port 8080 --log-level debug
//! evrental-service --check                           # validate and exit
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use evrental::config::AppConfig;
use evrental::server::{init_tracing, ServerHandle, ServerOptions};

#[derive(Parser, Debug)]
#[command(
    name = "evrental-service",
    version,
    about = "Rental lifecycle orchestration and wallet ledger for EV rentals",
    long_about = "REST API for EV rental reservations, pickup tokens, handovers \
                  and fee reconciliation.\n\nDefault config: ~/.config/evrental/config.toml"
)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, env = "EVRENTAL_CONFIG")]
    config: Option<PathBuf>,

    /// REST API listen port
    #[arg(long)]
    api_port: Option<u16>,

    /// Database URL, e.g. sqlite://./evrental.db?mode=rwc
    #[arg(long, env = "EVRENTAL_DATABASE_URL")]
    database_url: Option<String>,

    /// Log filter (trace, debug, info, warn, error or a directive list)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Validate the effective configuration and exit
    #[arg(long)]
    check: bool,

    /// Do not apply database migrations on startup
    #[arg(long)]
    no_migrate: bool,
}

impl Cli {
    /// File config (or defaults when unreadable) with flags applied on top
    fn resolve_config(&self) -> (PathBuf, AppConfig, Option<String>) {
        let path = self.config.clone().unwrap_or_else(evrental::default_config_path);
        let (mut config, load_error) = match AppConfig::load(&path) {
            Ok(config) => (config, None),
            Err(e) => (AppConfig::default(), Some(e.to_string())),
        };

        if let Some(port) = self.api_port {
            config.server.api_port = port;
        }
        if let Some(url) = &self.database_url {
            config.database.url = url.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        (path, config, load_error)
    }
}

fn print_summary(path: &std::path::Path, config: &AppConfig) {
    println!("Configuration is valid");
    println!("  config file : {}", path.display());
    println!("  api address : {}", config.api_address());
    println!("  database    : {}", config.database.url);
    println!("  log level   : {}", config.logging.level);
    println!("  token ttl   : {}h", config.pickup.token_validity_hours);
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let (path, config, load_error) = cli.resolve_config();

    if cli.check {
        return match config.validate() {
            Ok(()) => {
                print_summary(&path, &config);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Configuration is invalid: {e}");
                ExitCode::FAILURE
            }
        };
    }

    init_tracing(&config);
    match load_error {
        Some(e) => info!("No usable config at {} ({}), using defaults", path.display(), e),
        None => info!("Configuration loaded from {}", path.display()),
    }

    let options = ServerOptions {
        config,
        auto_migrate: !cli.no_migrate,
    };
    let handle = match ServerHandle::start(options).await {
        Ok(handle) => handle,
        Err(e) => {
            error!("Startup failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    handle.install_signal_handler();
    info!("Press Ctrl+C to stop");
    handle.shutdown_signal().wait().await;
    handle.wait().await;
    ExitCode::SUCCESS
}
