//! Domain model for the Identity Verification context.

pub mod code;
pub mod commands;
pub mod otp;
