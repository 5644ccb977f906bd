//! Adapter lifecycle and routing for logrelay
//!
//! This crate provides:
//! - [`Registry`]: one live adapter per kind, persisted across restarts
//! - [`Router`]: redacted broadcast of all bus traffic on the `logs` stream
//! - [`Service`]: the control-plane subscriptions tying both to the bus

pub mod error;
pub mod registry;
pub mod router;
pub mod service;

pub use error::{RegistryError, Result, ServiceError};
pub use registry::Registry;
pub use router::Router;
pub use service::{Running, Service, ServiceOptions};
