//! Subscription tasks shared by every adapter

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use logrelay_bus::{Bus, MessageStream};
use logrelay_core::LogRecord;
use logrelay_core::subject::is_log_subject;
use logrelay_security::Redactor;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::Result;

/// Final delivery step of an adapter. Failures are logged by the sink and dropped.
#[async_trait]
pub trait Sink: Send + Sync + 'static {
    async fn deliver(&self, subject: &str, body: String);
}

/// Write path for pre-redacted `logger.log` records.
///
/// Handed out by adapters so callers can log without holding the registry lock.
#[async_trait]
pub trait RecordSink: Send + Sync + 'static {
    async fn log(&self, record: &LogRecord);
}

/// The live subscriptions of one adapter.
///
/// Cancellation is observed between messages, so `stop` lets an in-flight
/// delivery finish before the bus subscription is dropped.
pub struct Subscriptions {
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Subscriptions {
    /// Subscribe to every pattern and start one task per subscription.
    pub async fn start(
        adapter: &'static str,
        bus: Arc<dyn Bus>,
        patterns: &[&str],
        redactor: Redactor,
        sink: Arc<dyn Sink>,
    ) -> Result<Self> {
        let mut subscriptions = Self {
            token: CancellationToken::new(),
            tasks: Vec::with_capacity(patterns.len()),
        };

        for pattern in patterns {
            let stream = match bus.subscribe(pattern).await {
                Ok(stream) => stream,
                Err(err) => {
                    subscriptions.stop().await;
                    return Err(err.into());
                }
            };
            debug!(adapter, pattern, "subscribed");
            subscriptions.tasks.push(tokio::spawn(pump(
                adapter,
                stream,
                subscriptions.token.child_token(),
                redactor.clone(),
                Arc::clone(&sink),
            )));
        }

        Ok(subscriptions)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Cancel every task and wait until its bus subscription is released.
    pub async fn stop(&mut self) {
        self.token.cancel();
        for task in self.tasks.drain(..) {
            if let Err(err) = task.await {
                warn!(error = %err, "subscription task failed");
            }
        }
    }
}

impl Drop for Subscriptions {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn pump(
    adapter: &'static str,
    mut stream: MessageStream,
    token: CancellationToken,
    redactor: Redactor,
    sink: Arc<dyn Sink>,
) {
    loop {
        let message = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            next = stream.next() => match next {
                Some(message) => message,
                None => break,
            },
        };

        // Pre-redacted records arrive on logger.log and go through Adapter::log instead
        if is_log_subject(&message.subject) {
            continue;
        }

        let body = redactor.redact(&message.body()).await;
        sink.deliver(&message.subject, body).await;
    }
    debug!(adapter, "subscription closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use logrelay_bus::MemoryBus;
    use logrelay_security::{SecretDirectory, StaticSecretSource};
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct ChannelSink(mpsc::UnboundedSender<(String, String)>);

    #[async_trait]
    impl Sink for ChannelSink {
        async fn deliver(&self, subject: &str, body: String) {
            let _ = self.0.send((subject.to_string(), body));
        }
    }

    fn redactor() -> Redactor {
        let source = Arc::new(StaticSecretSource::new(vec![]));
        Redactor::new(Arc::new(SecretDirectory::new(source)))
    }

    #[tokio::test]
    async fn test_delivers_redacted_and_skips_log_subject() {
        let bus = MemoryBus::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut subscriptions = Subscriptions::start(
            "test",
            Arc::new(bus.clone()),
            &["*.*"],
            redactor(),
            Arc::new(ChannelSink(tx)),
        )
        .await
        .unwrap();
        assert_eq!(subscriptions.len(), 1);

        bus.publish("logger.log", br#"{"subject":"x"}"#.to_vec())
            .await
            .unwrap();
        bus.publish("service.create", br#"{"password":"hunter2"}"#.to_vec())
            .await
            .unwrap();

        let (subject, body) = rx.recv().await.unwrap();
        assert_eq!(subject, "service.create");
        assert_eq!(body, r#"{"password":"[OBFUSCATED]"}"#);

        subscriptions.stop().await;
        assert_eq!(bus.subscription_count(), 0);
    }

    #[tokio::test]
    async fn test_stop_releases_every_pattern() {
        let bus = MemoryBus::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut subscriptions = Subscriptions::start(
            "test",
            Arc::new(bus.clone()),
            &["*", "*.*", "*.*.*", "*.*.*.*"],
            redactor(),
            Arc::new(ChannelSink(tx)),
        )
        .await
        .unwrap();
        assert_eq!(bus.subscription_count(), 4);

        subscriptions.stop().await;
        assert_eq!(bus.subscription_count(), 0);

        bus.publish("a.b", b"late".to_vec()).await.unwrap();
        let nothing = tokio::time::timeout(Duration::from_millis(50), rx.recv()).await;
        assert!(matches!(nothing, Ok(None) | Err(_)));
    }
}
