//! Records exchanged on `logger.log` and on live streams

use serde::{Deserialize, Serialize};

pub const LEVEL_DEBUG: &str = "debug";
pub const LEVEL_INFO: &str = "info";
pub const LEVEL_ERROR: &str = "error";

pub const SYSTEM_USER: &str = "system";

/// An already-routed log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub subject: String,
    #[serde(default)]
    pub message: String,
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default = "default_user")]
    pub user: String,
}

impl LogRecord {
    /// Record for raw bus traffic observed by the router or an adapter.
    pub fn system(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            message: message.into(),
            level: LEVEL_DEBUG.to_string(),
            user: SYSTEM_USER.to_string(),
        }
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }
}

/// Record pushed onto a named live stream by the sse adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRecord {
    pub subject: String,
    pub body: String,
    pub level: String,
}

fn default_level() -> String {
    LEVEL_DEBUG.to_string()
}

fn default_user() -> String {
    SYSTEM_USER.to_string()
}
