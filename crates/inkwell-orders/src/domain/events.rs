//! Domain events for the Order Fulfillment context.
//!
//! Every state change is exactly one event, so compound updates (writer and
//! state, payment stamp and state, reviewer and state) are persisted as a
//! single append.

use chrono::{DateTime, Utc};
use inkwell_core::event::{DomainEvent, EventMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::WorkflowState;

/// Event type for `OrderPlaced`.
pub const ORDER_PLACED_EVENT_TYPE: &str = "order.placed";
/// Event type for `PaymentCaptured`.
pub const PAYMENT_CAPTURED_EVENT_TYPE: &str = "order.payment_captured";
/// Event type for `WriterAssigned`.
pub const WRITER_ASSIGNED_EVENT_TYPE: &str = "order.writer_assigned";
/// Event type for `ReviewRecorded`.
pub const REVIEW_RECORDED_EVENT_TYPE: &str = "order.review_recorded";
/// Event type for `StatusChanged`.
pub const STATUS_CHANGED_EVENT_TYPE: &str = "order.status_changed";

/// Order total in minor currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in minor units (cents, pence).
    pub amount_minor: i64,
    /// ISO 4217 currency code.
    pub currency: String,
}

/// Status reported by the payment collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Awaiting authorization.
    Pending,
    /// Authorized but not captured.
    Authorized,
    /// Funds captured.
    Captured,
}

/// Payment sub-record carried on the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Opaque reference issued by the payment provider.
    pub provider_reference: String,
    /// Payment method label (card, wallet, ...).
    pub method: String,
    /// Current payment status.
    pub status: PaymentStatus,
    /// Capture time, set by the paid transition.
    pub paid_at: Option<DateTime<Utc>>,
}

/// Emitted when checkout creates an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPlaced {
    /// The order identifier.
    pub order_id: Uuid,
    /// Owning customer account.
    pub customer_id: Uuid,
    /// Order total.
    pub price: Money,
    /// Payment as reported at checkout.
    pub payment: Payment,
    /// Shipping address, opaque to the core.
    pub shipping_address: serde_json::Value,
    /// Product selection references, opaque to the core.
    pub product_refs: Vec<String>,
}

/// Emitted when payment capture moves the order to `paid`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentCaptured {
    /// The order identifier.
    pub order_id: Uuid,
    /// State the order left.
    pub from: WorkflowState,
    /// Actor that reported the capture.
    pub actor_id: Uuid,
    /// Capture time.
    pub paid_at: DateTime<Utc>,
}

/// Emitted when a writer is assigned, moving the order to `assigned`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriterAssigned {
    /// The order identifier.
    pub order_id: Uuid,
    /// State the order left.
    pub from: WorkflowState,
    /// The assigned writer.
    pub writer_id: Uuid,
    /// Actor that made the assignment.
    pub actor_id: Uuid,
}

/// Emitted when quality control approves or sends back a draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRecorded {
    /// The order identifier.
    pub order_id: Uuid,
    /// State the order left.
    pub from: WorkflowState,
    /// `approved` or `changes_requested`.
    pub outcome: WorkflowState,
    /// The reviewing actor, recorded as the order's QC reference.
    pub reviewer_id: Uuid,
}

/// Emitted for every other transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChanged {
    /// The order identifier.
    pub order_id: Uuid,
    /// State the order left.
    pub from: WorkflowState,
    /// State the order entered.
    pub to: WorkflowState,
    /// Actor that made the change.
    pub actor_id: Uuid,
}

/// Event payload variants for the Order Fulfillment context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrderEventKind {
    /// The order was placed.
    OrderPlaced(OrderPlaced),
    /// Payment was captured.
    PaymentCaptured(PaymentCaptured),
    /// A writer was assigned.
    WriterAssigned(WriterAssigned),
    /// A review outcome was recorded.
    ReviewRecorded(ReviewRecorded),
    /// The workflow state changed.
    StatusChanged(StatusChanged),
}

impl OrderEventKind {
    /// The state the order is in after this event.
    #[must_use]
    pub fn resulting_state(&self) -> WorkflowState {
        match self {
            Self::OrderPlaced(_) => WorkflowState::PendingPayment,
            Self::PaymentCaptured(_) => WorkflowState::Paid,
            Self::WriterAssigned(_) => WorkflowState::Assigned,
            Self::ReviewRecorded(payload) => payload.outcome,
            Self::StatusChanged(payload) => payload.to,
        }
    }
}

/// Domain event envelope for the Order Fulfillment context.
#[derive(Debug, Clone)]
pub struct OrderEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: OrderEventKind,
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match &self.kind {
            OrderEventKind::OrderPlaced(_) => ORDER_PLACED_EVENT_TYPE,
            OrderEventKind::PaymentCaptured(_) => PAYMENT_CAPTURED_EVENT_TYPE,
            OrderEventKind::WriterAssigned(_) => WRITER_ASSIGNED_EVENT_TYPE,
            OrderEventKind::ReviewRecorded(_) => REVIEW_RECORDED_EVENT_TYPE,
            OrderEventKind::StatusChanged(_) => STATUS_CHANGED_EVENT_TYPE,
        }
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("OrderEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
