//! In-memory `OtpStore` for local development and tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use inkwell_core::error::DomainError;
use uuid::Uuid;

use crate::application::ports::OtpStore;
use crate::domain::otp::{Channel, OtpRecord};

/// An `OtpStore` that keeps every record in a single mutex-guarded vector.
///
/// Each operation holds the lock for its whole duration, which gives the
/// same atomicity the PostgreSQL store gets from transactions.
#[derive(Debug, Default)]
pub struct InMemoryOtpStore {
    records: Mutex<Vec<OtpRecord>>,
}

impl InMemoryOtpStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every stored record in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the lock is poisoned.
    pub fn records(&self) -> Result<Vec<OtpRecord>, DomainError> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<OtpRecord>>, DomainError> {
        self.records
            .lock()
            .map_err(|_| DomainError::Infrastructure("otp store lock poisoned".to_owned()))
    }
}

#[async_trait]
impl OtpStore for InMemoryOtpStore {
    async fn issue_within_limit(
        &self,
        record: &OtpRecord,
        window_start: DateTime<Utc>,
        max_issued: u32,
    ) -> Result<Option<u64>, DomainError> {
        let mut records = self.lock()?;
        let same_pair =
            |r: &OtpRecord| r.identifier == record.identifier && r.channel == record.channel;

        let recent = records
            .iter()
            .filter(|r| same_pair(r) && r.created_at > window_start)
            .count();
        if recent >= usize::try_from(max_issued).unwrap_or(usize::MAX) {
            return Ok(None);
        }

        let mut superseded = 0;
        for existing in records.iter_mut().filter(|r| same_pair(r) && !r.consumed) {
            existing.consumed = true;
            superseded += 1;
        }
        records.push(record.clone());
        Ok(Some(superseded))
    }

    async fn latest_unconsumed(
        &self,
        identifier: &str,
        channel: Channel,
    ) -> Result<Option<OtpRecord>, DomainError> {
        let records = self.lock()?;
        // Later pushes win ties on created_at.
        Ok(records
            .iter()
            .filter(|r| r.identifier == identifier && r.channel == channel && !r.consumed)
            .max_by_key(|r| r.created_at)
            .cloned())
    }

    async fn mark_consumed(&self, otp_id: Uuid) -> Result<bool, DomainError> {
        let mut records = self.lock()?;
        match records.iter_mut().find(|r| r.id == otp_id) {
            Some(record) if !record.consumed => {
                record.consumed = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
