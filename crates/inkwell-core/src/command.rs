//! Command abstractions.

use uuid::Uuid;

/// Trait that all commands implement.
///
/// Handlers use `command_type` and `correlation_id` as span fields so a
/// single request can be followed through its log lines and events.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// The type name for this command (for logging/routing).
    fn command_type(&self) -> &'static str;

    /// Correlation ID to trace this command through the system.
    fn correlation_id(&self) -> Uuid;
}
