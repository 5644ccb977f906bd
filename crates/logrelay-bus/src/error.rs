use thiserror::Error;

pub type Result<T> = std::result::Result<T, BusError>;

#[derive(Error, Debug)]
pub enum BusError {
    #[error("Failed to connect to bus: {0}")]
    Connect(String),

    #[error("Failed to publish on {subject}: {reason}")]
    Publish { subject: String, reason: String },

    #[error("Failed to subscribe to {pattern}: {reason}")]
    Subscribe { pattern: String, reason: String },

    #[error("Request on {subject} failed: {reason}")]
    Request { subject: String, reason: String },

    #[error("Request on {0} timed out")]
    Timeout(String),

    #[error("No responders for {0}")]
    NoResponders(String),
}
