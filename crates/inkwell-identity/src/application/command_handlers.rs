//! Command handlers for the Identity Verification context.
//!
//! Issuance: normalize, generate, then rate-limit, supersede and persist in
//! one store operation, then dispatch.
//! Verification: bypass check, latest unconsumed record, compare, expiry,
//! conditional consume.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use inkwell_core::clock::Clock;
use inkwell_core::command::Command;
use inkwell_core::error::DomainError;
use inkwell_core::redact::fingerprint;
use inkwell_core::rng::DeterministicRng;
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::application::ports::{NotificationDispatcher, OtpStore};
use crate::domain::code::VerificationPolicy;
use crate::domain::commands::{RequestCode, VerifyCode};
use crate::domain::otp::{
    Channel, OtpRecord, RATE_LIMIT_MAX_CODES, RATE_LIMIT_WINDOW_MINUTES, normalize_identifier,
};

/// Result of a successful `RequestCode`.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedCode {
    /// The persisted record.
    pub otp_id: Uuid,
    /// Normalized identifier the code is bound to.
    pub identifier: String,
    /// Channel the code is bound to.
    pub channel: Channel,
    /// The issued code, for out-of-band delivery only.
    #[serde(skip)]
    pub code: String,
    /// When the code stops verifying.
    pub expires_at: DateTime<Utc>,
    /// Number of earlier codes invalidated by this issuance.
    pub superseded: u64,
    /// Whether the dispatcher was invoked (false in bypass mode).
    pub dispatched: bool,
}

/// Result of a successful `VerifyCode`.
#[derive(Debug, Clone, Serialize)]
pub struct Verification {
    /// Normalized identifier that was verified.
    pub identifier: String,
    /// Channel that was verified.
    pub channel: Channel,
    /// The consumed record, absent when the master code was used.
    pub otp_id: Option<Uuid>,
    /// Whether the master code satisfied the check.
    pub bypassed: bool,
}

/// Handles the `RequestCode` command.
///
/// On a dispatch failure the freshly issued record is kept: the caller gets
/// `DomainError::DispatchFailed`, yet the code still verifies if it reaches
/// the user by other means.
///
/// # Errors
///
/// Returns `DomainError::Validation` for a malformed identifier,
/// `DomainError::RateLimited` when the trailing window is full (nothing is
/// written or sent), `DomainError::DispatchFailed` when the transport
/// reports failure, and `DomainError::Infrastructure` on storage failure.
#[instrument(
    skip_all,
    fields(
        command_type = command.command_type(),
        correlation_id = %command.correlation_id(),
        channel = %command.channel,
    )
)]
pub async fn handle_request_code(
    command: &RequestCode,
    policy: &VerificationPolicy,
    clock: &dyn Clock,
    rng: &Mutex<dyn DeterministicRng + Send>,
    store: &dyn OtpStore,
    dispatcher: &dyn NotificationDispatcher,
) -> Result<IssuedCode, DomainError> {
    let identifier = normalize_identifier(&command.identifier, command.channel)?;
    let who = fingerprint(&identifier);
    let now = clock.now();

    let code = {
        let mut rng = rng
            .lock()
            .map_err(|_| DomainError::Infrastructure("rng lock poisoned".to_owned()))?;
        policy.generate_code(&mut *rng)
    };
    let record = OtpRecord::issue(identifier, command.channel, code, command.purpose, now);

    let window_start = now - Duration::minutes(RATE_LIMIT_WINDOW_MINUTES);
    let Some(superseded) = store
        .issue_within_limit(&record, window_start, RATE_LIMIT_MAX_CODES)
        .await?
    else {
        warn!(identifier = %who, "code request rate limited");
        return Err(DomainError::RateLimited {
            limit: RATE_LIMIT_MAX_CODES,
            window_minutes: RATE_LIMIT_WINDOW_MINUTES,
        });
    };

    info!(
        identifier = %who,
        otp_id = %record.id,
        purpose = record.purpose.as_str(),
        superseded,
        "issued verification code"
    );

    let dispatched = if policy.is_bypass() {
        warn!(identifier = %who, "bypass mode active, skipping dispatch");
        false
    } else {
        if !dispatcher
            .send(record.channel, &record.identifier, &record.code)
            .await
        {
            warn!(identifier = %who, otp_id = %record.id, "code dispatch failed");
            return Err(DomainError::DispatchFailed(format!(
                "could not deliver code over {}",
                record.channel
            )));
        }
        true
    };

    Ok(IssuedCode {
        otp_id: record.id,
        identifier: record.identifier,
        channel: record.channel,
        code: record.code,
        expires_at: record.expires_at,
        superseded,
        dispatched,
    })
}

/// Handles the `VerifyCode` command.
///
/// "Never requested", "already used", "superseded" and "wrong code" all
/// report `DomainError::InvalidCode`. Only a correct but stale code reports
/// `DomainError::CodeExpired`, and it is left unconsumed.
///
/// # Errors
///
/// Returns `DomainError::Validation` for a malformed identifier or an empty
/// code, `DomainError::InvalidCode`, `DomainError::CodeExpired`, or
/// `DomainError::Infrastructure` on storage failure.
#[instrument(
    skip_all,
    fields(
        command_type = command.command_type(),
        correlation_id = %command.correlation_id(),
        channel = %command.channel,
    )
)]
pub async fn handle_verify_code(
    command: &VerifyCode,
    policy: &VerificationPolicy,
    clock: &dyn Clock,
    store: &dyn OtpStore,
) -> Result<Verification, DomainError> {
    let identifier = normalize_identifier(&command.identifier, command.channel)?;
    let submitted = command.code.trim();
    if submitted.is_empty() {
        return Err(DomainError::Validation("code must not be empty".to_owned()));
    }
    let who = fingerprint(&identifier);

    if policy.master_code() == Some(submitted) {
        warn!(identifier = %who, "verified with master code");
        return Ok(Verification {
            identifier,
            channel: command.channel,
            otp_id: None,
            bypassed: true,
        });
    }

    let Some(record) = store.latest_unconsumed(&identifier, command.channel).await? else {
        info!(identifier = %who, "no live code");
        return Err(DomainError::InvalidCode);
    };

    if !record.matches(submitted) {
        info!(identifier = %who, otp_id = %record.id, "code mismatch");
        return Err(DomainError::InvalidCode);
    }

    if record.is_expired_at(clock.now()) {
        info!(identifier = %who, otp_id = %record.id, "code expired");
        return Err(DomainError::CodeExpired);
    }

    if !store.mark_consumed(record.id).await? {
        // A concurrent verifier or a newer issuance got there first.
        info!(identifier = %who, otp_id = %record.id, "code consumed concurrently");
        return Err(DomainError::InvalidCode);
    }

    info!(identifier = %who, otp_id = %record.id, "code verified");
    Ok(Verification {
        identifier,
        channel: command.channel,
        otp_id: Some(record.id),
        bypassed: false,
    })
}
