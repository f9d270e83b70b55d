//! reviewd - coordination server for a peer code-review workflow
//!
//! CLI entry point.

use std::net::SocketAddr;

use clap::Parser;
use eyre::{Context, Result};
use tracing::info;

use reviewd::cli::{Cli, Command};
use reviewd::config::Config;
use reviewd::server::Server;
use reviewd::{shutdown, simulate};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level_str = cli_log_level.or(config_log_level);
    let level = if let Some(s) = level_str {
        match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        }
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    // Setup logging with priority: CLI > config > INFO default
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    // Load configuration
    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    match cli.command {
        Command::Serve { bind, participants } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            if let Some(participants) = participants {
                config.server.participants = participants;
            }
            config.validate()?;
            cmd_serve(&config).await
        }
        Command::Simulate {
            addr,
            rounds,
            participants,
        } => {
            let addr = addr.unwrap_or_else(|| config.server.bind.clone());
            let participants = participants.unwrap_or(config.server.participants);
            cmd_simulate(&addr, participants, rounds).await
        }
    }
}

/// Run the coordination server in the foreground until SIGINT/SIGTERM or
/// until every participant has disconnected.
async fn cmd_serve(config: &Config) -> Result<()> {
    let shutdown = shutdown::install_handler()?;

    let server = Server::bind(config, shutdown).await?;
    info!(
        addr = %server.local_addr()?,
        participants = config.server.participants,
        "reviewd listening"
    );

    server.run().await
}

/// Drive a running server with scripted participants.
async fn cmd_simulate(addr: &str, participants: usize, rounds: u32) -> Result<()> {
    let addr: SocketAddr = addr.parse().context(format!("invalid server address '{addr}'"))?;
    simulate::run(addr, participants, rounds).await
}
