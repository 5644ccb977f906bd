use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid logger type")]
    UnknownAdapterKind(String),

    #[error("Invalid adapter configuration: {0}")]
    InvalidConfig(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
