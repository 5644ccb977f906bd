use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "logrelay")]
#[command(about = "Redacting log router for a NATS bus", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (default: platform config dir)
    #[arg(long, global = true, env = "LOGRELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// NATS server URL, overrides the config file
    #[arg(long, global = true)]
    pub nats_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the relay service
    Serve,

    /// Manage the adapters of a running service
    #[command(subcommand)]
    Adapters(AdapterCommands),

    /// Print the resolved configuration
    Config,
}

#[derive(Subcommand)]
pub enum AdapterCommands {
    /// List active adapters
    List {
        /// Reply timeout in milliseconds
        #[arg(long, default_value = "2000")]
        timeout_ms: u64,
    },

    /// Create or replace an adapter
    Set {
        /// Adapter configuration, e.g. '{"type":"sse","uuid":"abc"}'
        #[arg(id = "adapter_config", value_name = "CONFIG")]
        config: String,

        /// Reply timeout in milliseconds
        #[arg(long, default_value = "2000")]
        timeout_ms: u64,
    },

    /// Remove an optional adapter
    Delete {
        /// Adapter type (logstash, rollbar, sse)
        kind: String,

        /// Reply timeout in milliseconds
        #[arg(long, default_value = "2000")]
        timeout_ms: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_with_overrides() {
        let cli = Cli::try_parse_from([
            "logrelay",
            "serve",
            "--config",
            "/etc/logrelay.toml",
            "--nats-url",
            "nats://bus:4222",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Serve));
        assert_eq!(cli.config, Some(PathBuf::from("/etc/logrelay.toml")));
        assert_eq!(cli.nats_url.as_deref(), Some("nats://bus:4222"));
    }

    #[test]
    fn test_adapters_set() {
        let cli =
            Cli::try_parse_from(["logrelay", "adapters", "set", r#"{"type":"sse","uuid":"a"}"#])
                .unwrap();
        match cli.command {
            Commands::Adapters(AdapterCommands::Set { config, timeout_ms }) => {
                assert_eq!(config, r#"{"type":"sse","uuid":"a"}"#);
                assert_eq!(timeout_ms, 2000);
            }
            _ => panic!("expected adapters set"),
        }
    }

    #[test]
    fn test_adapters_delete_requires_kind() {
        assert!(Cli::try_parse_from(["logrelay", "adapters", "delete"]).is_err());
    }
}
