use logrelay_bus::BusError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DirectoryError>;

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Directory request failed: {0}")]
    Bus(#[from] BusError),

    #[error("Malformed directory response: {0}")]
    Malformed(#[from] serde_json::Error),
}
