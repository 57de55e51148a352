//! Application services for the Identity Verification context.

pub mod command_handlers;
pub mod ports;
