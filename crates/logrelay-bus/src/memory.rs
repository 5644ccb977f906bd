//! In-process bus
//!
//! Delivers to every live subscription whose pattern matches the subject.
//! Each subscription owns an unbounded queue, so ordering is preserved per
//! subscription and a slow subscriber never blocks a publisher.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream;
use tokio::sync::mpsc;
use tracing::debug;

use crate::bus::{Bus, BusMessage, MessageStream};
use crate::error::{BusError, Result};
use crate::subject::subject_matches;

const INBOX_PREFIX: &str = "_INBOX.";

struct Route {
    pattern: String,
    tx: mpsc::UnboundedSender<BusMessage>,
}

#[derive(Clone, Default)]
pub struct MemoryBus {
    routes: Arc<Mutex<Vec<Route>>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of subscriptions that are still alive.
    pub fn subscription_count(&self) -> usize {
        let mut routes = self.routes();
        routes.retain(|route| !route.tx.is_closed());
        routes.len()
    }

    /// Number of live subscriptions on exactly this pattern.
    pub fn subscribers_on(&self, pattern: &str) -> usize {
        let mut routes = self.routes();
        routes.retain(|route| !route.tx.is_closed());
        routes.iter().filter(|route| route.pattern == pattern).count()
    }

    fn routes(&self) -> MutexGuard<'_, Vec<Route>> {
        match self.routes.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn deliver(&self, message: BusMessage) -> usize {
        let mut routes = self.routes();
        routes.retain(|route| !route.tx.is_closed());

        let mut delivered = 0;
        for route in routes.iter() {
            if subject_matches(&route.pattern, &message.subject)
                && route.tx.send(message.clone()).is_ok()
            {
                delivered += 1;
            }
        }
        delivered
    }

    fn register(&self, pattern: &str) -> MessageStream {
        let (tx, rx) = mpsc::unbounded_channel();
        self.routes().push(Route {
            pattern: pattern.to_string(),
            tx,
        });
        Box::pin(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|message| (message, rx))
        }))
    }
}

#[async_trait]
impl Bus for MemoryBus {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<()> {
        let delivered = self.deliver(BusMessage::new(subject, payload));
        debug!(subject, delivered, "memory bus publish");
        Ok(())
    }

    async fn request(
        &self,
        subject: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<BusMessage> {
        let inbox = format!("{INBOX_PREFIX}{}", uuid::Uuid::new_v4().simple());
        let mut replies = self.register(&inbox);

        let request = BusMessage::new(subject, payload).with_reply(inbox);
        if self.deliver(request) == 0 {
            return Err(BusError::NoResponders(subject.to_string()));
        }

        match tokio::time::timeout(timeout, replies.next()).await {
            Ok(Some(reply)) => Ok(reply),
            Ok(None) => Err(BusError::Request {
                subject: subject.to_string(),
                reason: "reply inbox closed".to_string(),
            }),
            Err(_) => Err(BusError::Timeout(subject.to_string())),
        }
    }

    async fn subscribe(&self, pattern: &str) -> Result<MessageStream> {
        Ok(self.register(pattern))
    }
}
