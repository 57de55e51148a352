//! Application services for the Order Fulfillment context.

pub mod command_handlers;
pub mod query_handlers;
