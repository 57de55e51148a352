//! Commands for the Order Fulfillment context.

use inkwell_core::actor::Actor;
use inkwell_core::command::Command;
use uuid::Uuid;

use super::events::{Money, PaymentStatus};
use super::state::WorkflowState;

/// Command issued by checkout to create an order in `pending_payment`.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The order identifier chosen by checkout.
    pub order_id: Uuid,
    /// Owning customer account.
    pub customer_id: Uuid,
    /// Order total.
    pub price: Money,
    /// Payment provider reference.
    pub payment_reference: String,
    /// Payment method label.
    pub payment_method: String,
    /// Payment status at checkout.
    pub payment_status: PaymentStatus,
    /// Shipping address, opaque to the core.
    pub shipping_address: serde_json::Value,
    /// Product selection references.
    pub product_refs: Vec<String>,
}

impl Command for PlaceOrder {
    fn command_type(&self) -> &'static str {
        "order.place"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to move an order to another workflow state.
#[derive(Debug, Clone)]
pub struct TransitionOrder {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The order identifier.
    pub order_id: Uuid,
    /// Requested target state.
    pub target: WorkflowState,
    /// Actor supplied by the authorization layer.
    pub actor: Actor,
    /// Writer to assign; required when `target` is `assigned`.
    pub writer_id: Option<Uuid>,
}

impl Command for TransitionOrder {
    fn command_type(&self) -> &'static str {
        "order.transition"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
