//! Adapter trait and factory

use std::sync::Arc;

use async_trait::async_trait;
use logrelay_bus::Bus;
use logrelay_core::{AdapterConfig, AdapterKind, LogRecord};
use logrelay_security::Redactor;

use crate::basic::BasicAdapter;
use crate::error::Result;
use crate::hub::StreamHub;
use crate::logstash::LogstashAdapter;
use crate::rollbar::RollbarAdapter;
use crate::sse::SseAdapter;
use crate::subscription::RecordSink;

/// A configured log sink
#[async_trait]
pub trait Adapter: Send + Sync {
    fn kind(&self) -> AdapterKind;

    fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Configuration this instance was built from, as returned to control-plane clients
    fn config(&self) -> AdapterConfig;

    /// Subscribe to the patterns and start delivering redacted traffic
    async fn manage(
        &mut self,
        bus: Arc<dyn Bus>,
        patterns: &[&str],
        redactor: Redactor,
    ) -> Result<()>;

    /// Release every subscription and sink resource
    async fn stop(&mut self);

    /// Handle for records received on `logger.log`, if this sink accepts them
    fn record_sink(&self) -> Option<Arc<dyn RecordSink>> {
        None
    }

    async fn log(&self, record: &LogRecord) {
        if let Some(sink) = self.record_sink() {
            sink.log(record).await;
        }
    }
}

/// Build an unmanaged adapter from its configuration.
///
/// Validation happens here, so a failing configuration never touches the
/// instance it was meant to replace.
pub async fn build(config: AdapterConfig, hub: &StreamHub) -> Result<Box<dyn Adapter>> {
    let adapter: Box<dyn Adapter> = match config {
        AdapterConfig::Basic(config) => Box::new(BasicAdapter::open(config).await?),
        AdapterConfig::Logstash(config) => Box::new(LogstashAdapter::new(config)?),
        AdapterConfig::Rollbar(config) => Box::new(RollbarAdapter::new(config)?),
        AdapterConfig::Sse(config) => Box::new(SseAdapter::new(config, hub.clone())?),
    };
    Ok(adapter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AdapterError;
    use logrelay_core::{RollbarConfig, SseConfig};

    #[tokio::test]
    async fn test_build_each_kind() {
        let dir = tempfile::tempdir().unwrap();
        let logfile = dir.path().join("out.log");
        std::fs::write(&logfile, "").unwrap();
        let hub = StreamHub::new();

        let configs = [
            AdapterConfig::basic(logfile.to_string_lossy()),
            AdapterConfig::parse(br#"{"type":"logstash","hostname":"127.0.0.1","port":1}"#)
                .unwrap(),
            AdapterConfig::Rollbar(RollbarConfig {
                token: "tok".to_string(),
                environment: "test".to_string(),
                endpoint: None,
            }),
            AdapterConfig::Sse(SseConfig {
                uuid: "abc".to_string(),
            }),
        ];

        for config in configs {
            let adapter = build(config.clone(), &hub).await.unwrap();
            assert_eq!(adapter.kind(), config.kind());
            assert_eq!(adapter.name(), config.kind().as_str());
            assert_eq!(adapter.config(), config);
        }
    }

    #[tokio::test]
    async fn test_build_rejects_missing_logfile() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.log");
        let result = build(AdapterConfig::basic(missing.to_string_lossy()), &StreamHub::new()).await;
        assert!(matches!(result, Err(AdapterError::MissingLogFile(_))));
    }
}
