//! Rollbar crash-report sink

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use logrelay_bus::Bus;
use logrelay_core::record::{LEVEL_ERROR, LEVEL_INFO};
use logrelay_core::{AdapterConfig, AdapterKind, LogRecord, RollbarConfig};
use logrelay_security::Redactor;
use serde_json::{Value, json};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::adapter::Adapter;
use crate::error::{AdapterError, Result};
use crate::subscription::{RecordSink, Sink, Subscriptions};

pub const DEFAULT_ENDPOINT: &str = "https://api.rollbar.com/api/1/item/";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

pub struct RollbarAdapter {
    config: RollbarConfig,
    reporter: Arc<Reporter>,
    subscriptions: Option<Subscriptions>,
}

impl RollbarAdapter {
    pub fn new(config: RollbarConfig) -> Result<Self> {
        if config.token.is_empty() {
            return Err(AdapterError::InvalidConfig(
                "rollbar token is required".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("logrelay/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let reporter = Reporter {
            client,
            endpoint: config
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            token: config.token.clone(),
            environment: config.environment.clone(),
        };

        Ok(Self {
            config,
            reporter: Arc::new(reporter),
            subscriptions: None,
        })
    }
}

#[async_trait]
impl Adapter for RollbarAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Rollbar
    }

    fn config(&self) -> AdapterConfig {
        AdapterConfig::Rollbar(self.config.clone())
    }

    async fn manage(
        &mut self,
        bus: Arc<dyn Bus>,
        patterns: &[&str],
        redactor: Redactor,
    ) -> Result<()> {
        if let Some(mut previous) = self.subscriptions.take() {
            previous.stop().await;
        }
        let sink: Arc<dyn Sink> = self.reporter.clone();
        self.subscriptions =
            Some(Subscriptions::start(self.name(), bus, patterns, redactor, sink).await?);
        info!(environment = %self.config.environment, "rollbar logger set up");
        Ok(())
    }

    async fn stop(&mut self) {
        info!("stopping rollbar logger");
        if let Some(mut subscriptions) = self.subscriptions.take() {
            subscriptions.stop().await;
        }
    }

    fn record_sink(&self) -> Option<Arc<dyn RecordSink>> {
        Some(self.reporter.clone())
    }
}

/// Level reported for bus traffic: errors are published on `*.error` subjects.
pub fn level_for(subject: &str) -> &'static str {
    if subject.contains(".error") {
        LEVEL_ERROR
    } else {
        LEVEL_INFO
    }
}

struct Reporter {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    environment: String,
}

impl Reporter {
    fn item(&self, level: &str, subject: &str, body: &str) -> Value {
        json!({
            "access_token": self.token,
            "data": {
                "environment": self.environment,
                "level": level,
                "timestamp": OffsetDateTime::now_utc().unix_timestamp(),
                "platform": "logrelay",
                "body": {
                    "message": {
                        "body": format!("{subject} : '{body}'"),
                    },
                },
            },
        })
    }

    async fn report(&self, level: &str, subject: &str, body: &str) {
        let item = self.item(level, subject, body);
        match self.client.post(&self.endpoint).json(&item).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(subject, level, "reported to rollbar");
            }
            Ok(response) => {
                warn!(
                    subject,
                    status = response.status().as_u16(),
                    "rollbar rejected item"
                );
            }
            Err(err) => warn!(subject, error = %err, "dropped rollbar delivery"),
        }
    }
}

#[async_trait]
impl Sink for Reporter {
    async fn deliver(&self, subject: &str, body: String) {
        self.report(level_for(subject), subject, &body).await;
    }
}

#[async_trait]
impl RecordSink for Reporter {
    async fn log(&self, record: &LogRecord) {
        self.report(&record.level, &record.subject, &record.message)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(token: &str) -> RollbarConfig {
        RollbarConfig {
            token: token.to_string(),
            environment: "staging".to_string(),
            endpoint: None,
        }
    }

    #[test]
    fn test_level_follows_message_subject() {
        assert_eq!(level_for("service.create.aws.error"), "error");
        assert_eq!(level_for("network.error"), "error");
        assert_eq!(level_for("service.create.aws.done"), "info");
        assert_eq!(level_for("errors"), "info");
    }

    #[test]
    fn test_empty_token_rejected() {
        let result = RollbarAdapter::new(config(""));
        assert!(matches!(result, Err(AdapterError::InvalidConfig(_))));
    }

    #[test]
    fn test_default_endpoint() {
        let adapter = RollbarAdapter::new(config("tok")).unwrap();
        assert_eq!(adapter.reporter.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_item_shape() {
        let adapter = RollbarAdapter::new(config("tok")).unwrap();
        let item = adapter.reporter.item("error", "a.error", "boom");
        assert_eq!(item["access_token"], "tok");
        assert_eq!(item["data"]["environment"], "staging");
        assert_eq!(item["data"]["level"], "error");
        assert_eq!(item["data"]["body"]["message"]["body"], "a.error : 'boom'");
    }
}
