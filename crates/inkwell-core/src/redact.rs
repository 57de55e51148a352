//! Redaction helpers for log output.

use sha2::{Digest, Sha256};

/// Returns a short, stable fingerprint of a contact identifier.
///
/// Log lines carry the fingerprint instead of the raw email address or
/// phone number so that traces can be correlated without exposing PII.
#[must_use]
pub fn fingerprint(identifier: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(identifier.as_bytes()));
    digest[..12].to_owned()
}
