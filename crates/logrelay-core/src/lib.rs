//! Core domain models for logrelay
//!
//! This crate contains:
//! - Adapter kinds and their wire configurations
//! - Log records exchanged on the bus and on live streams
//! - Well-known bus subjects

pub mod adapter;
pub mod error;
pub mod record;
pub mod subject;

pub use adapter::{
    AdapterConfig, AdapterKind, BasicConfig, LogstashConfig, RollbarConfig, SseConfig,
};
pub use error::{CoreError, Result};
pub use record::{LogRecord, StreamRecord};
