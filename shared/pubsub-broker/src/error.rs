//! Error types for broker operations.

use thiserror::Error;

/// Result type alias for broker operations.
pub type BrokerResult<T> = Result<T, BrokerError>;

/// Errors the broker client surfaces to callers.
#[derive(Error, Debug)]
pub enum BrokerError {
    /// The message exceeded `MAX_MESSAGE_SIZE_BYTES`.
    #[error("payload too large")]
    PayloadTooLarge,

    /// The broker rejected the call for a reason that isn't one of our semantic kinds
    /// (connection failure, broker-side error, ...).
    #[error("broker error: {0}")]
    Broker(String),
}
