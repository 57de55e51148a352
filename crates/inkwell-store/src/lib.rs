//! Inkwell — PostgreSQL persistence.
//!
//! Event streams for orders, one-time code records, and the actor
//! directory, all against the schema in the workspace `migrations/`.

pub mod pg_actor_directory;
pub mod pg_event_repository;
pub mod pg_otp_store;

use inkwell_core::error::DomainError;

/// Maps a driver error to `DomainError::Infrastructure`.
pub(crate) fn infrastructure(err: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(format!("database error: {err}"))
}
