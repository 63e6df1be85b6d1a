//! Command-line interface for scenelock.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// scenelock - hierarchical object locking for collaborative scene editing.
#[derive(Debug, Parser)]
#[command(name = "scenelock")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "SCENELOCK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "SCENELOCK_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, env = "SCENELOCK_JSON_LOGS")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the lock server
    Serve {
        /// Bind address for the RPC server
        #[arg(long, env = "SCENELOCK_BIND_ADDR")]
        bind_addr: Option<String>,

        /// Bind address for the metrics server
        #[arg(long)]
        metrics_addr: Option<String>,

        /// Disable the metrics server
        #[arg(long)]
        no_metrics: bool,

        /// Attempts per lock request
        #[arg(long)]
        retry_attempts: Option<u32>,

        /// Delay between attempts in milliseconds
        #[arg(long)]
        retry_delay_ms: Option<u64>,
    },

    /// Validate the configuration and print it
    CheckConfig,

    /// Show version information
    Version,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve() {
        let cli = Cli::try_parse_from([
            "scenelock",
            "--log-level",
            "debug",
            "serve",
            "--bind-addr",
            "127.0.0.1:7000",
            "--retry-attempts",
            "3",
            "--no-metrics",
        ])
        .unwrap();

        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Commands::Serve {
                bind_addr,
                no_metrics,
                retry_attempts,
                retry_delay_ms,
                ..
            } => {
                assert_eq!(bind_addr.as_deref(), Some("127.0.0.1:7000"));
                assert!(no_metrics);
                assert_eq!(retry_attempts, Some(3));
                assert_eq!(retry_delay_ms, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_command_required() {
        assert!(Cli::try_parse_from(["scenelock"]).is_err());
    }
}
