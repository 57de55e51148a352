//! Query handlers for the Order Fulfillment context.
//!
//! This module contains query handlers that reconstitute orders from stored
//! events and return read-only view DTOs.

use chrono::{DateTime, Utc};
use inkwell_core::actor::{Actor, ActorRole};
use inkwell_core::error::DomainError;
use inkwell_core::repository::EventRepository;
use serde::Serialize;
use uuid::Uuid;

use crate::application::command_handlers;
use crate::domain::aggregates::{Order, StatusEntry};
use crate::domain::events::{Money, Payment};
use crate::domain::state::WorkflowState;

/// Read-only view of an order aggregate.
#[derive(Debug, Serialize)]
pub struct OrderView {
    /// The order identifier.
    pub order_id: Uuid,
    /// Current workflow state.
    pub state: WorkflowState,
    /// Owning customer.
    pub customer_id: Option<Uuid>,
    /// Assigned writer, once assigned.
    pub writer_id: Option<Uuid>,
    /// Last quality-control reviewer.
    pub qc_id: Option<Uuid>,
    /// Order total.
    pub price: Option<Money>,
    /// Payment sub-record.
    pub payment: Option<Payment>,
    /// Shipping address as supplied at checkout.
    pub shipping_address: serde_json::Value,
    /// Product selection references.
    pub product_refs: Vec<String>,
    /// Every state the order entered, oldest first.
    pub status_history: Vec<StatusEntry>,
    /// Time of the most recent status change.
    pub updated_at: Option<DateTime<Utc>>,
    /// Current version (event count).
    pub version: i64,
}

/// A state the caller may move the order to, with the roles that gate it.
#[derive(Debug, Serialize)]
pub struct AllowedTransition {
    /// Target state.
    pub target: WorkflowState,
    /// Roles eligible for this edge.
    pub eligible_roles: &'static [ActorRole],
}

async fn load(order_id: Uuid, repo: &dyn EventRepository) -> Result<Order, DomainError> {
    let stored_events = repo.load_events(order_id).await?;
    if stored_events.is_empty() {
        return Err(DomainError::AggregateNotFound(order_id));
    }
    command_handlers::reconstitute(order_id, &stored_events)
}

/// Retrieves an order by its aggregate ID.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if no events exist for the ID.
/// Returns `DomainError::Infrastructure` if event deserialization fails.
pub async fn get_order_by_id(
    order_id: Uuid,
    repo: &dyn EventRepository,
) -> Result<OrderView, DomainError> {
    let order = load(order_id, repo).await?;
    let state = order
        .state()
        .ok_or(DomainError::AggregateNotFound(order_id))?;
    let updated_at = order.status_history.last().map(|entry| entry.at);
    Ok(OrderView {
        order_id,
        state,
        customer_id: order.customer_id,
        writer_id: order.writer_id,
        qc_id: order.qc_id,
        price: order.price,
        payment: order.payment,
        shipping_address: order.shipping_address,
        product_refs: order.product_refs,
        status_history: order.status_history,
        updated_at,
        version: order.version,
    })
}

/// Lists the transitions `actor` may perform on the order right now.
///
/// Terminal orders and actors that pass no gate get an empty list.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if no events exist for the ID.
pub async fn get_allowed_transitions(
    order_id: Uuid,
    actor: &Actor,
    repo: &dyn EventRepository,
) -> Result<Vec<AllowedTransition>, DomainError> {
    let order = load(order_id, repo).await?;
    Ok(order
        .allowed_transitions(actor)
        .into_iter()
        .map(|target| AllowedTransition {
            target,
            eligible_roles: target.eligible_roles(),
        })
        .collect())
}
