//! Routes for the Order Fulfillment bounded context.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use inkwell_core::actor::Actor;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use inkwell_orders::application::command_handlers;
use inkwell_orders::application::query_handlers::{self, AllowedTransition, OrderView};
use inkwell_orders::domain::commands;
use inkwell_orders::domain::events::{Money, PaymentStatus};
use inkwell_orders::domain::state::WorkflowState;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /.
#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    /// The order identifier chosen by checkout.
    pub order_id: Uuid,
    /// Owning customer.
    pub customer_id: Uuid,
    /// Order total.
    pub price: Money,
    /// Payment provider reference.
    pub payment_reference: String,
    /// Payment method label.
    pub payment_method: String,
    /// Payment status at checkout.
    pub payment_status: PaymentStatus,
    /// Shipping address, stored as given.
    #[serde(default)]
    pub shipping_address: serde_json::Value,
    /// Product selection references.
    #[serde(default)]
    pub product_refs: Vec<String>,
}

/// Request body for POST /{order_id}/transition.
#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    /// Requested target state.
    pub target: WorkflowState,
    /// The acting principal, as resolved by the authorization layer.
    pub actor: Actor,
    /// Writer to assign; required when `target` is `assigned`.
    #[serde(default)]
    pub writer_id: Option<Uuid>,
}

/// Request body for POST /{order_id}/allowed-transitions.
#[derive(Debug, Deserialize)]
pub struct AllowedTransitionsRequest {
    /// The acting principal.
    pub actor: Actor,
}

/// Response body returned after a command is successfully handled.
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    /// IDs of the domain events produced and persisted.
    pub event_ids: Vec<Uuid>,
}

/// POST /
#[instrument(skip(state, request), fields(order_id = %request.order_id))]
async fn place_order(
    State(state): State<AppState>,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command = commands::PlaceOrder {
        correlation_id: Uuid::new_v4(),
        order_id: request.order_id,
        customer_id: request.customer_id,
        price: request.price,
        payment_reference: request.payment_reference,
        payment_method: request.payment_method,
        payment_status: request.payment_status,
        shipping_address: request.shipping_address,
        product_refs: request.product_refs,
    };

    info!(correlation_id = %command.correlation_id, "handling place_order command");

    let result = command_handlers::handle_place_order(
        &command,
        state.clock.as_ref(),
        &*state.event_repository,
    )
    .await?;

    let event_ids = result.stored_events.iter().map(|e| e.event_id).collect();

    Ok(Json(CommandResponse { event_ids }))
}

/// POST /{order_id}/transition
#[instrument(
    skip(state, request),
    fields(target = %request.target, actor_role = %request.actor.role)
)]
async fn transition_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(request): Json<TransitionRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command = commands::TransitionOrder {
        correlation_id: Uuid::new_v4(),
        order_id,
        target: request.target,
        actor: request.actor,
        writer_id: request.writer_id,
    };

    info!(correlation_id = %command.correlation_id, "handling transition_order command");

    let result = command_handlers::handle_transition_order(
        &command,
        state.clock.as_ref(),
        &*state.event_repository,
        &*state.actor_directory,
    )
    .await?;

    let event_ids = result.stored_events.iter().map(|e| e.event_id).collect();

    Ok(Json(CommandResponse { event_ids }))
}

/// GET /{order_id}
async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderView>, ApiError> {
    let view = query_handlers::get_order_by_id(order_id, &*state.event_repository).await?;
    Ok(Json(view))
}

/// POST /{order_id}/allowed-transitions
async fn allowed_transitions(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(request): Json<AllowedTransitionsRequest>,
) -> Result<Json<Vec<AllowedTransition>>, ApiError> {
    let allowed = query_handlers::get_allowed_transitions(
        order_id,
        &request.actor,
        &*state.event_repository,
    )
    .await?;
    Ok(Json(allowed))
}

/// Returns the router for the orders context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(place_order))
        .route("/{order_id}", get(get_order))
        .route("/{order_id}/transition", post(transition_order))
        .route("/{order_id}/allowed-transitions", post(allowed_transitions))
}
