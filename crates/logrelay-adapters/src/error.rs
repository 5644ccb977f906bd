use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("Specified file '{0}' does not exist")]
    MissingLogFile(String),

    #[error("Seems I don't have permissions to write on {path}")]
    LogFileAccess {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid adapter configuration: {0}")]
    InvalidConfig(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP error {status}: {url}")]
    Status { url: String, status: u16 },

    #[error("Bus error: {0}")]
    Bus(#[from] logrelay_bus::BusError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AdapterError>;
