//! Domain model for the Order Fulfillment context.

pub mod aggregates;
pub mod commands;
pub mod events;
pub mod state;
