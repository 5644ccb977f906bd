//! Live-stream sink

use std::sync::Arc;

use async_trait::async_trait;
use logrelay_bus::Bus;
use logrelay_core::record::LEVEL_INFO;
use logrelay_core::subject::LOGS_STREAM;
use logrelay_core::{AdapterConfig, AdapterKind, SseConfig, StreamRecord};
use logrelay_security::Redactor;
use tracing::{debug, info, warn};

use crate::adapter::Adapter;
use crate::error::{AdapterError, Result};
use crate::hub::StreamHub;
use crate::subscription::{Sink, Subscriptions};

/// Publishes redacted traffic on the hub stream named by the configured uuid.
pub struct SseAdapter {
    config: SseConfig,
    publisher: Arc<StreamPublisher>,
    subscriptions: Option<Subscriptions>,
}

impl SseAdapter {
    pub fn new(config: SseConfig, hub: StreamHub) -> Result<Self> {
        if config.uuid.is_empty() {
            return Err(AdapterError::InvalidConfig(
                "sse stream uuid is required".to_string(),
            ));
        }
        // The router owns `logs`; closing it on stop would end every viewer
        if config.uuid == LOGS_STREAM {
            return Err(AdapterError::InvalidConfig(format!(
                "sse stream uuid '{}' is reserved",
                LOGS_STREAM
            )));
        }
        let publisher = StreamPublisher {
            hub,
            stream: config.uuid.clone(),
        };
        Ok(Self {
            config,
            publisher: Arc::new(publisher),
            subscriptions: None,
        })
    }
}

#[async_trait]
impl Adapter for SseAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Sse
    }

    fn config(&self) -> AdapterConfig {
        AdapterConfig::Sse(self.config.clone())
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
        self.publisher.hub.open(&self.publisher.stream);
        let sink: Arc<dyn Sink> = self.publisher.clone();
        self.subscriptions =
            Some(Subscriptions::start(self.name(), bus, patterns, redactor, sink).await?);
        info!(stream = %self.config.uuid, "sse logger set up");
        Ok(())
    }

    async fn stop(&mut self) {
        info!(stream = %self.config.uuid, "stopping sse logger");
        if let Some(mut subscriptions) = self.subscriptions.take() {
            subscriptions.stop().await;
        }
        self.publisher.hub.close(&self.publisher.stream);
    }
}

struct StreamPublisher {
    hub: StreamHub,
    stream: String,
}

#[async_trait]
impl Sink for StreamPublisher {
    async fn deliver(&self, subject: &str, body: String) {
        let record = StreamRecord {
            subject: subject.to_string(),
            body,
            level: LEVEL_INFO.to_string(),
        };
        match serde_json::to_string(&record) {
            Ok(payload) => {
                let viewers = self.hub.publish(&self.stream, payload);
                debug!(stream = %self.stream, viewers, "published to stream");
            }
            Err(err) => warn!(error = %err, "could not encode stream record"),
        }
    }
}
