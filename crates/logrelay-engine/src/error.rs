//! Error types for logrelay-engine

use logrelay_adapters::AdapterError;
use logrelay_bus::BusError;
use logrelay_core::CoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RegistryError>;

/// Failures of a control-plane request; the message is what the caller receives.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Invalid logger type")]
    InvalidType,

    #[error("Invalid logger configuration: {0}")]
    InvalidConfig(String),

    #[error("Basic logger is not optional")]
    BasicNotOptional,

    #[error("{0}")]
    Adapter(#[from] AdapterError),

    #[error("No basic logger could be started: {0}")]
    NoBasicAdapter(String),
}

impl From<CoreError> for RegistryError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::UnknownAdapterKind(_) => RegistryError::InvalidType,
            CoreError::InvalidConfig(err) => RegistryError::InvalidConfig(err.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Startup cancelled")]
    Cancelled,

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Bus(#[from] BusError),
}
