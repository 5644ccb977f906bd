mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use logrelay_config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = cli::Cli::parse();

    let config_path = cli.config.unwrap_or_else(Config::config_path);
    let mut config = Config::load_from(&config_path)?;
    if let Some(url) = cli.nats_url {
        config.nats_url = url;
    }

    match cli.command {
        cli::Commands::Serve => commands::serve::handle(config).await,
        cli::Commands::Adapters(cmd) => commands::adapters::handle(cmd, &config).await,
        cli::Commands::Config => commands::config::handle(&config, &config_path),
    }
}
