//! Message bus layer for logrelay
//!
//! This crate provides:
//! - The [`Bus`] trait used by every other crate
//! - [`NatsBus`], backed by an async-nats client
//! - [`MemoryBus`], an in-process bus with NATS subject semantics

pub mod bus;
pub mod error;
pub mod memory;
pub mod nats;
pub mod subject;

pub use bus::{Bus, BusMessage, MessageStream, respond};
pub use error::{BusError, Result};
pub use memory::MemoryBus;
pub use nats::NatsBus;
pub use subject::subject_matches;
