//! Bus trait

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::Stream;

use crate::Result;

/// A message as delivered to a subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub subject: String,
    pub reply: Option<String>,
    pub payload: Vec<u8>,
}

impl BusMessage {
    pub fn new(subject: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            subject: subject.into(),
            reply: None,
            payload: payload.into(),
        }
    }

    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        self.reply = Some(reply.into());
        self
    }

    /// Payload as text, replacing invalid UTF-8 sequences.
    pub fn body(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// Stream of messages for one subscription. Dropping it unsubscribes.
pub type MessageStream = Pin<Box<dyn Stream<Item = BusMessage> + Send>>;

/// Publish/subscribe transport with request/reply.
#[async_trait]
pub trait Bus: Send + Sync {
    /// Fire-and-forget publish
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<()>;

    /// Publish with a reply inbox and wait for the first answer
    async fn request(
        &self,
        subject: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<BusMessage>;

    /// Subscribe to a subject pattern (`*` and `>` wildcards)
    async fn subscribe(&self, pattern: &str) -> Result<MessageStream>;
}

/// Answer a request. Messages without a reply subject are silently ignored.
pub async fn respond(bus: &dyn Bus, message: &BusMessage, body: Vec<u8>) -> Result<()> {
    match &message.reply {
        Some(reply) => bus.publish(reply, body).await,
        None => Ok(()),
    }
}
