//! Router: redacts all bus traffic onto the `logs` live stream

use logrelay_adapters::StreamHub;
use logrelay_bus::BusMessage;
use logrelay_core::LogRecord;
use logrelay_core::subject::{LOGS_STREAM, is_routable};
use logrelay_security::Redactor;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct Router {
    redactor: Redactor,
    hub: StreamHub,
}

impl Router {
    pub fn new(redactor: Redactor, hub: StreamHub) -> Self {
        Self { redactor, hub }
    }

    /// Redact and broadcast one message. Returns false when the subject is not routed.
    pub async fn route(&self, message: &BusMessage) -> bool {
        if !is_routable(&message.subject) {
            return false;
        }

        let redacted = self.redactor.redact(&message.body()).await;
        let record = LogRecord::system(&message.subject, redacted);
        match serde_json::to_string(&record) {
            Ok(payload) => {
                let viewers = self.hub.publish(LOGS_STREAM, payload);
                debug!(subject = %message.subject, viewers, "routed");
                true
            }
            Err(err) => {
                warn!(subject = %message.subject, error = %err, "could not encode record");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logrelay_security::{SecretDirectory, StaticSecretSource};
    use std::sync::Arc;

    fn router(hub: &StreamHub) -> Router {
        let source = Arc::new(StaticSecretSource::new(vec![]));
        Router::new(Redactor::new(Arc::new(SecretDirectory::new(source))), hub.clone())
    }

    #[tokio::test]
    async fn test_routes_redacted_record() {
        let hub = StreamHub::new();
        hub.open(LOGS_STREAM);
        let mut viewer = hub.subscribe(LOGS_STREAM).unwrap();

        let routed = router(&hub)
            .route(&BusMessage::new("service.create", r#"{"password":"pw"}"#))
            .await;
        assert!(routed);

        let record: LogRecord = serde_json::from_str(&viewer.recv().await.unwrap()).unwrap();
        assert_eq!(record.subject, "service.create");
        assert_eq!(record.message, r#"{"password":"[OBFUSCATED]"}"#);
        assert_eq!(record.level, "debug");
        assert_eq!(record.user, "system");
    }

    #[tokio::test]
    async fn test_skips_log_and_inbox_subjects() {
        let hub = StreamHub::new();
        hub.open(LOGS_STREAM);
        let router = router(&hub);

        assert!(!router.route(&BusMessage::new("logger.log", "{}")).await);
        assert!(!router.route(&BusMessage::new("_INBOX.abc", "[]")).await);
    }
}
