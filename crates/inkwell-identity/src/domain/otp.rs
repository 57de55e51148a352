//! One-time code records and contact identifiers.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use inkwell_core::error::DomainError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifetime of an issued code.
pub const CODE_TTL_MINUTES: i64 = 5;

/// Length of the trailing window the rate limit is evaluated over.
pub const RATE_LIMIT_WINDOW_MINUTES: i64 = 60;

/// Maximum number of codes issued per identifier and channel in the window.
pub const RATE_LIMIT_MAX_CODES: u32 = 5;

/// Contact medium a code is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Email address.
    Email,
    /// Mobile phone number.
    Mobile,
}

impl Channel {
    /// Returns the canonical name of the channel.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Mobile => "mobile",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(Self::Email),
            "mobile" => Ok(Self::Mobile),
            other => Err(DomainError::Validation(format!("unknown channel: {other}"))),
        }
    }
}

/// Why a code was requested. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    /// Account creation.
    Signup,
    /// Passwordless login.
    Login,
    /// Binding a contact channel to an existing account.
    Verification,
}

impl Purpose {
    /// Returns the canonical name of the purpose.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Signup => "signup",
            Self::Login => "login",
            Self::Verification => "verification",
        }
    }
}

impl FromStr for Purpose {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "signup" => Ok(Self::Signup),
            "login" => Ok(Self::Login),
            "verification" => Ok(Self::Verification),
            other => Err(DomainError::Validation(format!("unknown purpose: {other}"))),
        }
    }
}

/// Normalizes a raw contact address for the given channel.
///
/// Emails are trimmed and lower-cased; phone numbers have every whitespace
/// character removed.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the normalized value is not a
/// plausible address for the channel.
pub fn normalize_identifier(raw: &str, channel: Channel) -> Result<String, DomainError> {
    match channel {
        Channel::Email => {
            let email = raw.trim().to_lowercase();
            let mut parts = email.split('@');
            let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next())
            else {
                return Err(DomainError::Validation(
                    "email must contain exactly one '@'".to_owned(),
                ));
            };
            if local.is_empty()
                || domain.is_empty()
                || !domain.contains('.')
                || email.chars().any(char::is_whitespace)
            {
                return Err(DomainError::Validation("malformed email address".to_owned()));
            }
            Ok(email)
        }
        Channel::Mobile => {
            let phone: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
            let digits = phone.strip_prefix('+').unwrap_or(&phone);
            if !(6..=15).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
                return Err(DomainError::Validation("malformed phone number".to_owned()));
            }
            Ok(phone)
        }
    }
}

/// A persisted one-time code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpRecord {
    /// Record identifier.
    pub id: Uuid,
    /// Normalized contact address.
    pub identifier: String,
    /// Channel the code was issued for.
    pub channel: Channel,
    /// The code as issued.
    pub code: String,
    /// Why the code was requested.
    pub purpose: Purpose,
    /// Issuance time.
    pub created_at: DateTime<Utc>,
    /// Time after which the code no longer verifies.
    pub expires_at: DateTime<Utc>,
    /// Whether the code was used or superseded.
    pub consumed: bool,
}

impl OtpRecord {
    /// Builds a fresh, unconsumed record issued at `now`.
    #[must_use]
    pub fn issue(
        identifier: String,
        channel: Channel,
        code: String,
        purpose: Purpose,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            identifier,
            channel,
            code,
            purpose,
            created_at: now,
            expires_at: now + Duration::minutes(CODE_TTL_MINUTES),
            consumed: false,
        }
    }

    /// Returns `true` if `now` is past the expiry instant.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Exact string comparison against a trimmed submission.
    #[must_use]
    pub fn matches(&self, submitted: &str) -> bool {
        self.code == submitted.trim()
    }
}
