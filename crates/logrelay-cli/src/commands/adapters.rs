use std::time::Duration;

use anyhow::{Context, Result, bail};
use logrelay_bus::{Bus, NatsBus};
use logrelay_config::Config;
use logrelay_core::AdapterKind;
use logrelay_core::subject::{LOGGER_DEL, LOGGER_FIND, LOGGER_SET};
use serde_json::{Value, json};

use crate::cli::AdapterCommands;

pub async fn handle(cmd: AdapterCommands, config: &Config) -> Result<()> {
    let (subject, body, timeout_ms) = request_for(cmd)?;

    let bus = NatsBus::connect(&config.nats_url)
        .await
        .with_context(|| format!("Failed to connect to NATS at {}", config.nats_url))?;
    let reply = bus
        .request(subject, body.into_bytes(), Duration::from_millis(timeout_ms))
        .await
        .with_context(|| format!("No reply on {}; is the service running?", subject))?;

    let value: Value =
        serde_json::from_slice(&reply.payload).context("Service sent a malformed reply")?;
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        bail!("{}", error);
    }
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn request_for(cmd: AdapterCommands) -> Result<(&'static str, String, u64)> {
    match cmd {
        AdapterCommands::List { timeout_ms } => Ok((LOGGER_FIND, "{}".to_string(), timeout_ms)),
        AdapterCommands::Set { config, timeout_ms } => {
            serde_json::from_str::<Value>(&config)
                .context("Adapter configuration must be a JSON object")?;
            Ok((LOGGER_SET, config, timeout_ms))
        }
        AdapterCommands::Delete { kind, timeout_ms } => {
            let kind: AdapterKind = kind.parse()?;
            Ok((LOGGER_DEL, json!({ "type": kind }).to_string(), timeout_ms))
        }
    }
}
