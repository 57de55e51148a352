//! `PostgreSQL` implementation of the `OtpStore` port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use inkwell_core::error::DomainError;
use inkwell_identity::application::ports::OtpStore;
use inkwell_identity::domain::otp::{Channel, OtpRecord};

use crate::infrastructure;

/// PostgreSQL-backed one-time code store.
///
/// The rate-limit count, supersession and insertion for one identifier and
/// channel run in a single transaction under an advisory lock on that pair.
/// Concurrent issuances for the pair are serialized, so the window never
/// overfills and at most one record stays unconsumed.
#[derive(Debug, Clone)]
pub struct PgOtpStore {
    pool: PgPool,
}

impl PgOtpStore {
    /// Creates a new `PgOtpStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn record_from_row(row: &PgRow) -> Result<OtpRecord, DomainError> {
    let channel: String = row.try_get("channel").map_err(infrastructure)?;
    let purpose: String = row.try_get("purpose").map_err(infrastructure)?;
    Ok(OtpRecord {
        id: row.try_get("id").map_err(infrastructure)?,
        identifier: row.try_get("identifier").map_err(infrastructure)?,
        channel: channel.parse()?,
        code: row.try_get("code").map_err(infrastructure)?,
        purpose: purpose.parse()?,
        created_at: row.try_get("created_at").map_err(infrastructure)?,
        expires_at: row.try_get("expires_at").map_err(infrastructure)?,
        consumed: row.try_get("consumed").map_err(infrastructure)?,
    })
}

#[async_trait]
impl OtpStore for PgOtpStore {
    async fn issue_within_limit(
        &self,
        record: &OtpRecord,
        window_start: DateTime<Utc>,
        max_issued: u32,
    ) -> Result<Option<u64>, DomainError> {
        let mut tx = self.pool.begin().await.map_err(infrastructure)?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1 || ':' || $2, 0))")
            .bind(&record.identifier)
            .bind(record.channel.as_str())
            .execute(&mut *tx)
            .await
            .map_err(infrastructure)?;

        let recent: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*)::bigint
            FROM otp_records
            WHERE identifier = $1 AND channel = $2 AND created_at > $3
            ",
        )
        .bind(&record.identifier)
        .bind(record.channel.as_str())
        .bind(window_start)
        .fetch_one(&mut *tx)
        .await
        .map_err(infrastructure)?;

        if recent >= i64::from(max_issued) {
            // Dropping the transaction rolls back and releases the lock.
            return Ok(None);
        }

        let superseded = sqlx::query(
            r"
            UPDATE otp_records
            SET consumed = TRUE
            WHERE identifier = $1 AND channel = $2 AND consumed = FALSE
            ",
        )
        .bind(&record.identifier)
        .bind(record.channel.as_str())
        .execute(&mut *tx)
        .await
        .map_err(infrastructure)?
        .rows_affected();

        sqlx::query(
            r"
            INSERT INTO otp_records (
                id, identifier, channel, code, purpose, created_at, expires_at, consumed
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(record.id)
        .bind(&record.identifier)
        .bind(record.channel.as_str())
        .bind(&record.code)
        .bind(record.purpose.as_str())
        .bind(record.created_at)
        .bind(record.expires_at)
        .bind(record.consumed)
        .execute(&mut *tx)
        .await
        .map_err(infrastructure)?;

        tx.commit().await.map_err(infrastructure)?;
        Ok(Some(superseded))
    }

    async fn latest_unconsumed(
        &self,
        identifier: &str,
        channel: Channel,
    ) -> Result<Option<OtpRecord>, DomainError> {
        let row = sqlx::query(
            r"
            SELECT id, identifier, channel, code, purpose, created_at, expires_at, consumed
            FROM otp_records
            WHERE identifier = $1 AND channel = $2 AND consumed = FALSE
            ORDER BY created_at DESC
            LIMIT 1
            ",
        )
        .bind(identifier)
        .bind(channel.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(infrastructure)?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn mark_consumed(&self, otp_id: Uuid) -> Result<bool, DomainError> {
        let result =
            sqlx::query("UPDATE otp_records SET consumed = TRUE WHERE id = $1 AND consumed = FALSE")
                .bind(otp_id)
                .execute(&self.pool)
                .await
                .map_err(infrastructure)?;
        Ok(result.rows_affected() == 1)
    }
}
