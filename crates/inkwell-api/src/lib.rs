//! Inkwell API — HTTP adapter over the identity and order contexts.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;
