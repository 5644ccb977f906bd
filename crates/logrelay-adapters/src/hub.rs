//! Named live streams
//!
//! A stream is a broadcast channel of serialized records. The router writes
//! to the `logs` stream, each sse adapter to the stream named by its uuid,
//! and websocket viewers subscribe by name.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::debug;

const STREAM_CAPACITY: usize = 256;

#[derive(Clone, Default)]
pub struct StreamHub {
    streams: Arc<DashMap<String, broadcast::Sender<String>>>,
}

impl StreamHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the stream if it does not exist yet.
    pub fn open(&self, name: &str) {
        self.streams.entry(name.to_string()).or_insert_with(|| {
            debug!(stream = name, "stream opened");
            broadcast::channel(STREAM_CAPACITY).0
        });
    }

    /// Remove the stream; connected viewers observe the end of the stream.
    pub fn close(&self, name: &str) {
        if self.streams.remove(name).is_some() {
            debug!(stream = name, "stream closed");
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.streams.contains_key(name)
    }

    /// Publish to a stream, returning how many viewers received it.
    pub fn publish(&self, name: &str, payload: String) -> usize {
        match self.streams.get(name) {
            Some(sender) => sender.send(payload).unwrap_or(0),
            None => 0,
        }
    }

    pub fn subscribe(&self, name: &str) -> Option<broadcast::Receiver<String>> {
        self.streams.get(name).map(|sender| sender.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_viewers() {
        let hub = StreamHub::new();
        hub.open("logs");
        let mut viewer = hub.subscribe("logs").unwrap();

        assert_eq!(hub.publish("logs", "hello".to_string()), 1);
        assert_eq!(viewer.recv().await.unwrap(), "hello");
    }

    #[test]
    fn test_unknown_stream() {
        let hub = StreamHub::new();
        assert!(!hub.contains("nope"));
        assert!(hub.subscribe("nope").is_none());
        assert_eq!(hub.publish("nope", "x".to_string()), 0);
    }

    #[tokio::test]
    async fn test_close_ends_viewers() {
        let hub = StreamHub::new();
        hub.open("abc");
        let mut viewer = hub.subscribe("abc").unwrap();
        hub.close("abc");

        assert!(!hub.contains("abc"));
        assert!(matches!(
            viewer.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
    }

    #[test]
    fn test_open_is_idempotent() {
        let hub = StreamHub::new();
        hub.open("logs");
        let viewer = hub.subscribe("logs").unwrap();
        hub.open("logs");
        assert_eq!(hub.publish("logs", "x".to_string()), 1);
        drop(viewer);
    }
}
