//! Inkwell — Identity Verification bounded context.
//!
//! Responsible for issuing, rate-limiting and single-use verification of
//! one-time codes sent over email or mobile channels.

pub mod application;
pub mod domain;
pub mod memory;
