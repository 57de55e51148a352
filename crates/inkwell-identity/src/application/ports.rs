//! Storage and transport interfaces consumed by the verification engine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use inkwell_core::error::DomainError;
use uuid::Uuid;

use crate::domain::otp::{Channel, OtpRecord};

/// Persistence for one-time code records.
///
/// Records are never deleted through this interface; consumed and
/// superseded records remain for audit and rate-limit counting.
#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Issues `record` if fewer than `max_issued` records exist for its pair
    /// with `created_at` strictly after `window_start`. When admitted, every
    /// unconsumed record for the pair is marked consumed and `record` is
    /// inserted.
    ///
    /// The count, the supersession and the insert are one atomic operation
    /// per pair. Returns `None` when the window is full and nothing was
    /// written, otherwise the number of superseded records.
    async fn issue_within_limit(
        &self,
        record: &OtpRecord,
        window_start: DateTime<Utc>,
        max_issued: u32,
    ) -> Result<Option<u64>, DomainError>;

    /// Returns the most recently created unconsumed record for the pair.
    async fn latest_unconsumed(
        &self,
        identifier: &str,
        channel: Channel,
    ) -> Result<Option<OtpRecord>, DomainError>;

    /// Flips `consumed` from false to true. Returns `false` if the record was
    /// already consumed (or does not exist), so only one caller ever wins.
    async fn mark_consumed(&self, otp_id: Uuid) -> Result<bool, DomainError>;
}

/// Out-of-band delivery of codes (email, SMS).
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Sends `code` to `identifier` over `channel`. Best effort: returns
    /// `false` if the transport reported a failure.
    async fn send(&self, channel: Channel, identifier: &str, code: &str) -> bool;
}
