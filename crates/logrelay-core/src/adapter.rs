//! Adapter kinds and their wire configurations

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Kind of sink. At most one adapter per kind is live at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterKind {
    Basic,
    Logstash,
    Rollbar,
    Sse,
}

impl AdapterKind {
    /// Replay order used when rebuilding adapters at startup.
    pub const ALL: [AdapterKind; 4] = [
        AdapterKind::Basic,
        AdapterKind::Logstash,
        AdapterKind::Rollbar,
        AdapterKind::Sse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterKind::Basic => "basic",
            AdapterKind::Logstash => "logstash",
            AdapterKind::Rollbar => "rollbar",
            AdapterKind::Sse => "sse",
        }
    }

    /// The basic file adapter is mandatory and cannot be deleted from the bus.
    pub fn is_mandatory(&self) -> bool {
        matches!(self, AdapterKind::Basic)
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdapterKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "basic" => Ok(AdapterKind::Basic),
            "logstash" => Ok(AdapterKind::Logstash),
            "rollbar" => Ok(AdapterKind::Rollbar),
            "sse" => Ok(AdapterKind::Sse),
            other => Err(CoreError::UnknownAdapterKind(other.to_string())),
        }
    }
}

/// Configuration carried by `logger.set`, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdapterConfig {
    Basic(BasicConfig),
    Logstash(LogstashConfig),
    Rollbar(RollbarConfig),
    Sse(SseConfig),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicConfig {
    pub logfile: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogstashConfig {
    pub hostname: String,
    pub port: u16,
    /// Request timeout in seconds, 0 means the default of one second
    #[serde(default)]
    pub timeout: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbarConfig {
    pub token: String,
    #[serde(default)]
    pub environment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SseConfig {
    pub uuid: String,
}

#[derive(Deserialize)]
struct KindProbe {
    #[serde(rename = "type")]
    kind: String,
}

/// Reads only the `type` field of a control message.
pub fn probe_kind(raw: &[u8]) -> Result<AdapterKind> {
    let probe: KindProbe = serde_json::from_slice(raw)?;
    probe.kind.parse()
}

impl AdapterConfig {
    /// Parse a raw `logger.set` body, distinguishing an unknown `type` from a malformed body.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        probe_kind(raw)?;
        Ok(serde_json::from_slice(raw)?)
    }

    pub fn kind(&self) -> AdapterKind {
        match self {
            AdapterConfig::Basic(_) => AdapterKind::Basic,
            AdapterConfig::Logstash(_) => AdapterKind::Logstash,
            AdapterConfig::Rollbar(_) => AdapterKind::Rollbar,
            AdapterConfig::Sse(_) => AdapterKind::Sse,
        }
    }

    pub fn basic(logfile: impl Into<String>) -> Self {
        AdapterConfig::Basic(BasicConfig {
            logfile: logfile.into(),
        })
    }
}
