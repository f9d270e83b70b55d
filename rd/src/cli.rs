//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// reviewd - coordination server for a peer code-review workflow
#[derive(Parser)]
#[command(
    name = "rd",
    about = "Coordination server for a peer code-review workflow",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the coordination server in the foreground
    Serve {
        /// Listen address, e.g. 127.0.0.1:7077 (overrides config)
        #[arg(short, long)]
        bind: Option<String>,

        /// Number of participant connections to accept (overrides config)
        #[arg(short, long)]
        participants: Option<usize>,
    },

    /// Drive a running server with scripted participants
    Simulate {
        /// Server address to connect to (defaults to the configured bind)
        #[arg(short, long)]
        addr: Option<String>,

        /// Programs each participant submits before leaving
        #[arg(short, long, default_value = "3")]
        rounds: u32,

        /// Participants to spawn (defaults to the configured pool size)
        #[arg(short, long)]
        participants: Option<usize>,
    },
}
