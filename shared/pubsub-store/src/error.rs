//! Semantic error kinds for metadata store operations (spec §4.1, §7).
//!
//! These signal *semantic* conditions, not transport details — the gateway maps each
//! kind to an HTTP status at the handler boundary (see `gateway::types::error::AppError`).

use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors a metadata store operation can fail with.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The requested resource does not exist. Carries a human-readable description of
    /// what was being looked up (e.g. which usernames were missing).
    #[error("not found: {0}")]
    NotFound(String),

    /// The resource being inserted already exists.
    #[error("already exists: {0}")]
    Exists(String),

    /// An ack was submitted for a subscription with no outstanding pull.
    #[error("no ack pending")]
    NoAckPending,

    /// An ack's offset fell outside `[offset, nextOffset]`.
    #[error("wrong ack")]
    WrongAck,

    /// An ack arrived after `ackDeadlineSec` had elapsed since the pull.
    #[error("ack timeout")]
    AckTimeout,
}
