//! Inkwell — Order Fulfillment bounded context.
//!
//! Responsible for the order lifecycle from placement to delivery or
//! cancellation: role-gated workflow transitions, writer assignment, and
//! the append-only status history.

pub mod application;
pub mod domain;
