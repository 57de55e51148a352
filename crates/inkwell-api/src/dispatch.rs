//! Default code delivery for the server binary.

use async_trait::async_trait;
use inkwell_core::redact::fingerprint;
use inkwell_identity::application::ports::NotificationDispatcher;
use inkwell_identity::domain::otp::Channel;
use tracing::info;

/// Hands codes to the log sink instead of a real transport.
///
/// Only a fingerprint of the identifier is written; the code itself never
/// reaches the logs. Pair it with `OTP_MASTER_CODE` outside production.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingDispatcher;

#[async_trait]
impl NotificationDispatcher for LoggingDispatcher {
    async fn send(&self, channel: Channel, identifier: &str, code: &str) -> bool {
        info!(
            %channel,
            identifier = %fingerprint(identifier),
            code_length = code.len(),
            "one-time code handed to log transport"
        );
        true
    }
}
