//! async-nats backed bus

use std::time::Duration;

use async_nats::Client;
use async_trait::async_trait;
use futures_util::StreamExt;
use tracing::info;

use crate::bus::{Bus, BusMessage, MessageStream};
use crate::error::{BusError, Result};

#[derive(Clone)]
pub struct NatsBus {
    client: Client,
}

impl NatsBus {
    pub async fn connect(url: &str) -> Result<Self> {
        info!(nats_url = %url, "connecting to nats");
        let client = async_nats::connect(url)
            .await
            .map_err(|err| BusError::Connect(err.to_string()))?;
        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

impl From<async_nats::Message> for BusMessage {
    fn from(message: async_nats::Message) -> Self {
        BusMessage {
            subject: message.subject.to_string(),
            reply: message.reply.map(|reply| reply.to_string()),
            payload: message.payload.to_vec(),
        }
    }
}

#[async_trait]
impl Bus for NatsBus {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<()> {
        self.client
            .publish(subject.to_string(), payload.into())
            .await
            .map_err(|err| BusError::Publish {
                subject: subject.to_string(),
                reason: err.to_string(),
            })
    }

    async fn request(
        &self,
        subject: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<BusMessage> {
        let request = self.client.request(subject.to_string(), payload.into());
        match tokio::time::timeout(timeout, request).await {
            Ok(Ok(message)) => Ok(message.into()),
            Ok(Err(err)) => Err(BusError::Request {
                subject: subject.to_string(),
                reason: err.to_string(),
            }),
            Err(_) => Err(BusError::Timeout(subject.to_string())),
        }
    }

    async fn subscribe(&self, pattern: &str) -> Result<MessageStream> {
        let subscriber = self
            .client
            .subscribe(pattern.to_string())
            .await
            .map_err(|err| BusError::Subscribe {
                pattern: pattern.to_string(),
                reason: err.to_string(),
            })?;
        Ok(Box::pin(subscriber.map(BusMessage::from)))
    }
}
