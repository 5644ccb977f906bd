//! Log sinks
//!
//! Every sink implements [`Adapter`]. An adapter owns one subscription task
//! per bus pattern; each task redacts the payload and hands it to the sink.

pub mod adapter;
pub mod basic;
pub mod error;
pub mod hub;
pub mod logstash;
pub mod rollbar;
pub mod sse;
pub mod subscription;

pub use adapter::{Adapter, build};
pub use basic::BasicAdapter;
pub use error::{AdapterError, Result};
pub use hub::StreamHub;
pub use logstash::LogstashAdapter;
pub use rollbar::RollbarAdapter;
pub use sse::SseAdapter;
pub use subscription::{RecordSink, Sink, Subscriptions};
