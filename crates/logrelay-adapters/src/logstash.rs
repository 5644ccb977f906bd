//! Logstash HTTP input shipper

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use logrelay_bus::Bus;
use logrelay_core::{AdapterConfig, AdapterKind, LogstashConfig};
use logrelay_security::Redactor;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::adapter::Adapter;
use crate::error::{AdapterError, Result};
use crate::subscription::{Sink, Subscriptions};

const DEFAULT_TIMEOUT_SECS: u64 = 1;

/// Body posted for every message
#[derive(Debug, Serialize)]
struct LogMessage<'a> {
    subject: &'a str,
    message: &'a str,
}

pub struct LogstashAdapter {
    config: LogstashConfig,
    shipper: Arc<Shipper>,
    subscriptions: Option<Subscriptions>,
}

impl LogstashAdapter {
    pub fn new(config: LogstashConfig) -> Result<Self> {
        if config.hostname.is_empty() {
            return Err(AdapterError::InvalidConfig(
                "logstash hostname is required".to_string(),
            ));
        }

        let timeout = match config.timeout {
            0 => DEFAULT_TIMEOUT_SECS,
            secs => secs,
        };
        let client = reqwest::Client::builder()
            .user_agent(concat!("logrelay/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(timeout))
            .build()?;
        let url = format!("http://{}:{}", config.hostname, config.port);

        Ok(Self {
            config,
            shipper: Arc::new(Shipper { client, url }),
            subscriptions: None,
        })
    }

    pub fn url(&self) -> &str {
        &self.shipper.url
    }
}

#[async_trait]
impl Adapter for LogstashAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Logstash
    }

    fn config(&self) -> AdapterConfig {
        AdapterConfig::Logstash(self.config.clone())
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

        if let Err(err) = self
            .shipper
            .post(&serde_json::json!({ "service": "initial" }))
            .await
        {
            warn!(url = %self.shipper.url, error = %err, "logstash probe failed");
        }

        let sink: Arc<dyn Sink> = self.shipper.clone();
        self.subscriptions =
            Some(Subscriptions::start(self.name(), bus, patterns, redactor, sink).await?);
        info!(url = %self.shipper.url, "logstash logger set up");
        Ok(())
    }

    async fn stop(&mut self) {
        info!("stopping logstash logger");
        if let Some(mut subscriptions) = self.subscriptions.take() {
            subscriptions.stop().await;
        }
    }
}

struct Shipper {
    client: reqwest::Client,
    url: String,
}

impl Shipper {
    async fn post<T: Serialize + ?Sized>(&self, body: &T) -> Result<()> {
        let response = self.client.post(&self.url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }
        debug!(url = %self.url, status = status.as_u16(), "shipped to logstash");
        Ok(())
    }
}

#[async_trait]
impl Sink for Shipper {
    async fn deliver(&self, subject: &str, body: String) {
        let message = LogMessage {
            subject,
            message: &body,
        };
        if let Err(err) = self.post(&message).await {
            warn!(url = %self.url, subject, error = %err, "dropped logstash delivery");
        }
    }
}
