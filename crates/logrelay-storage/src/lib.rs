//! Storage layer for logrelay
//!
//! Keeps the last configuration set for each adapter kind so the service can
//! rebuild its adapters after a restart.

pub mod error;
pub mod state;

pub use error::{Result, StorageError};
pub use state::{PersistedState, StateStore};
