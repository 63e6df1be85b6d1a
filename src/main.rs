//! scenelock CLI - Main entry point.

use scenelock::cli::{Cli, Commands};
use scenelock::config::SceneLockConfig;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();

    let mut config = match &cli.config {
        Some(path) => SceneLockConfig::from_file(path)?,
        None => SceneLockConfig::default(),
    };
    if let Some(level) = cli.log_level {
        config.observability.log_level = level;
    }
    if cli.json_logs {
        config.observability.json_logs = true;
    }

    match cli.command {
        Commands::Serve {
            bind_addr,
            metrics_addr,
            no_metrics,
            retry_attempts,
            retry_delay_ms,
        } => {
            if let Some(addr) = bind_addr {
                config.server.bind_addr = addr.parse()?;
            }
            if let Some(addr) = metrics_addr {
                config.observability.metrics_addr = addr.parse()?;
            }
            if no_metrics {
                config.observability.metrics_enabled = false;
            }
            if let Some(attempts) = retry_attempts {
                config.lock.retry.max_attempts = attempts;
            }
            if let Some(delay) = retry_delay_ms {
                config.lock.retry.delay = Duration::from_millis(delay);
            }

            scenelock::run(config).await?;
        }

        Commands::CheckConfig => {
            config.validate()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }

        Commands::Version => {
            println!("scenelock v{}", env!("CARGO_PKG_VERSION"));
            println!("Hierarchical object locking for collaborative scene editing");
        }
    }

    Ok(())
}
