//! Commands for the Identity Verification context.

use inkwell_core::command::Command;
use uuid::Uuid;

use super::otp::{Channel, Purpose};

/// Command to issue a one-time code.
#[derive(Debug, Clone)]
pub struct RequestCode {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Raw contact address as supplied by the caller.
    pub identifier: String,
    /// Channel to deliver the code over.
    pub channel: Channel,
    /// Why the code is requested.
    pub purpose: Purpose,
}

impl Command for RequestCode {
    fn command_type(&self) -> &'static str {
        "identity.request_code"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to verify a submitted one-time code.
#[derive(Debug, Clone)]
pub struct VerifyCode {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Raw contact address as supplied by the caller.
    pub identifier: String,
    /// Channel the code was issued for.
    pub channel: Channel,
    /// The code the user typed.
    pub code: String,
}

impl Command for VerifyCode {
    fn command_type(&self) -> &'static str {
        "identity.verify_code"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
