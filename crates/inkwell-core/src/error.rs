//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type.
///
/// Every failure path of the identity and order contexts is one of these
/// variants. None of them is fatal to the process; `Infrastructure` wraps
/// storage outages that the caller may surface as a server error.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An aggregate was not found.
    #[error("aggregate not found: {0}")]
    AggregateNotFound(Uuid),

    /// A referenced actor does not exist.
    #[error("actor not found: {0}")]
    ActorNotFound(Uuid),

    /// Optimistic concurrency conflict.
    #[error("concurrency conflict on aggregate {aggregate_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The aggregate that had the conflict.
        aggregate_id: Uuid,
        /// The expected version.
        expected: i64,
        /// The actual version found.
        actual: i64,
    },

    /// The requested workflow transition is not an edge of the graph.
    #[error("illegal transition from {from} to {to}")]
    IllegalTransition {
        /// The state the aggregate is currently in.
        from: String,
        /// The requested target state.
        to: String,
    },

    /// The actor is not eligible to perform the requested operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Too many one-time codes were requested in the trailing window.
    #[error("rate limited: at most {limit} codes per {window_minutes} minutes")]
    RateLimited {
        /// Maximum number of codes per window.
        limit: u32,
        /// Window length in minutes.
        window_minutes: i64,
    },

    /// The submitted code does not match any live code.
    #[error("invalid verification code")]
    InvalidCode,

    /// The submitted code matched but has expired.
    #[error("verification code expired")]
    CodeExpired,

    /// The notification transport reported a delivery failure.
    #[error("dispatch failed: {0}")]
    DispatchFailed(String),

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}
