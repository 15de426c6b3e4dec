//! ResortOS Server
//!
//! A small organization dashboard server: a task lifecycle engine, team
//! roster, and activity log over SQLite, exposed as a REST API.

use anyhow::Result;
use clap::Parser;
use resort_os::api::{server, AppState};
use resort_os::cli::{Cli, Command};
use resort_os::config::Config;
use resort_os::db::{seed, Database};
use std::fs::OpenOptions;
use std::path::Path;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on --log option
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    match cli.log.as_str() {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    let mut config = Config::load(cli.config.as_deref().map(Path::new))?;

    // Override config from CLI arguments
    if let Some(db_path) = &cli.database {
        config.server.db_path = db_path.into();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    match cli.command {
        Some(Command::Seed) => {
            config.ensure_db_dir()?;
            let db = Database::open(&config.server.db_path)?;
            seed::seed(&db)?;
        }
        Some(Command::Serve) | None => {
            run_server(config).await?;
        }
    }

    Ok(())
}

/// Run the API server until interrupted.
async fn run_server(config: Config) -> Result<()> {
    config.ensure_db_dir()?;

    info!("Starting ResortOS server v{}", env!("CARGO_PKG_VERSION"));
    info!("Database: {:?}", config.server.db_path);

    let db = Database::open(&config.server.db_path)?;
    info!("Database initialized successfully");

    let state = AppState::new(db, config.server.org_id);
    let (shutdown_tx, addr) = server::start_server(state, config.server.port).await?;
    info!("Server ready on http://{}", addr);

    tokio::signal::ctrl_c().await?;
    info!("Interrupt received, shutting down");
    let _ = shutdown_tx.send(());

    Ok(())
}
