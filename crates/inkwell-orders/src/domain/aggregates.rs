//! Aggregate roots for the Order Fulfillment context.

use chrono::{DateTime, Utc};
use inkwell_core::actor::{Actor, ActorRole};
use inkwell_core::aggregate::AggregateRoot;
use inkwell_core::clock::Clock;
use inkwell_core::error::DomainError;
use inkwell_core::event::EventMetadata;
use serde::Serialize;
use uuid::Uuid;

use super::events::{
    Money, OrderEvent, OrderEventKind, OrderPlaced, Payment, PaymentCaptured, PaymentStatus,
    ReviewRecorded, StatusChanged, WriterAssigned,
};
use super::state::WorkflowState;

/// One entry of the append-only status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
    /// State entered.
    pub state: WorkflowState,
    /// Actor that caused the change.
    pub actor_id: Uuid,
    /// When the change happened.
    pub at: DateTime<Utc>,
}

/// The aggregate root for an order.
#[derive(Debug)]
pub struct Order {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Current version (event count).
    pub(crate) version: i64,
    /// Current workflow state; `None` until the order is placed.
    pub(crate) state: Option<WorkflowState>,
    pub(crate) customer_id: Option<Uuid>,
    pub(crate) writer_id: Option<Uuid>,
    pub(crate) qc_id: Option<Uuid>,
    pub(crate) price: Option<Money>,
    pub(crate) payment: Option<Payment>,
    pub(crate) shipping_address: serde_json::Value,
    pub(crate) product_refs: Vec<String>,
    pub(crate) status_history: Vec<StatusEntry>,
    /// Uncommitted events pending persistence.
    uncommitted_events: Vec<OrderEvent>,
}

impl Order {
    /// Creates a new, not yet placed order.
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            state: None,
            customer_id: None,
            writer_id: None,
            qc_id: None,
            price: None,
            payment: None,
            shipping_address: serde_json::Value::Null,
            product_refs: Vec::new(),
            status_history: Vec::new(),
            uncommitted_events: Vec::new(),
        }
    }

    /// Returns the current workflow state, if the order has been placed.
    #[must_use]
    pub fn state(&self) -> Option<WorkflowState> {
        self.state
    }

    /// Returns the assigned writer, if any.
    #[must_use]
    pub fn writer_id(&self) -> Option<Uuid> {
        self.writer_id
    }

    fn record(
        &mut self,
        kind: OrderEventKind,
        event_type: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) {
        let event = OrderEvent {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: event_type.to_owned(),
                aggregate_id: self.id,
                sequence_number: self.next_sequence_number(),
                correlation_id,
                causation_id: correlation_id,
                occurred_at: clock.now(),
            },
            kind,
        };
        self.uncommitted_events.push(event);
    }

    /// Places the order, producing an `OrderPlaced` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the order already exists, the
    /// price is negative, the currency is not a three-letter code, or the
    /// payment claims to be captured already.
    #[allow(clippy::too_many_arguments)]
    pub fn place(
        &mut self,
        customer_id: Uuid,
        price: Money,
        payment: Payment,
        shipping_address: serde_json::Value,
        product_refs: Vec<String>,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if self.state.is_some() || !self.uncommitted_events.is_empty() {
            return Err(DomainError::Validation(format!(
                "order {} already exists",
                self.id
            )));
        }
        if price.amount_minor < 0 {
            return Err(DomainError::Validation(
                "price must not be negative".to_owned(),
            ));
        }
        if price.currency.len() != 3 || !price.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(DomainError::Validation(format!(
                "invalid currency code: {}",
                price.currency
            )));
        }
        if payment.status == PaymentStatus::Captured {
            return Err(DomainError::Validation(
                "payment is captured by the paid transition, not at placement".to_owned(),
            ));
        }

        let kind = OrderEventKind::OrderPlaced(OrderPlaced {
            order_id: self.id,
            customer_id,
            price,
            payment: Payment {
                paid_at: None,
                ..payment
            },
            shipping_address,
            product_refs,
        });
        self.record(kind, super::events::ORDER_PLACED_EVENT_TYPE, correlation_id, clock);
        Ok(())
    }

    /// Validates that `actor` may move the order to `target` right now and
    /// returns the current state. Never mutates.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if the order was never placed,
    /// `DomainError::IllegalTransition` if `(current, target)` is not an edge,
    /// and `DomainError::Forbidden` if the actor fails the edge's gate.
    pub fn check_transition(
        &self,
        target: WorkflowState,
        actor: &Actor,
    ) -> Result<WorkflowState, DomainError> {
        let current = self.state.ok_or(DomainError::AggregateNotFound(self.id))?;
        if !current.can_transition_to(target) {
            return Err(DomainError::IllegalTransition {
                from: current.to_string(),
                to: target.to_string(),
            });
        }
        if !target.admits(actor, self.writer_id) {
            return Err(DomainError::Forbidden(format!(
                "{} {} may not move order {} to {target}",
                actor.role, actor.id, self.id
            )));
        }
        Ok(current)
    }

    /// Moves the order to `target`, producing exactly one event.
    ///
    /// `writer` is the resolved writer for the `assigned` edge and is ignored
    /// for every other target. Entering `paid` stamps the capture; entering
    /// `approved` or `changes_requested` records the reviewer.
    ///
    /// # Errors
    ///
    /// Everything `check_transition` returns, plus `DomainError::Validation`
    /// when assigning without a writer or with an actor who is not a writer.
    pub fn transition(
        &mut self,
        target: WorkflowState,
        actor: &Actor,
        writer: Option<&Actor>,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if !self.uncommitted_events.is_empty() {
            return Err(DomainError::Validation(
                "order has uncommitted changes".to_owned(),
            ));
        }
        let from = self.check_transition(target, actor)?;

        let (kind, event_type) = match target {
            WorkflowState::Paid => (
                OrderEventKind::PaymentCaptured(PaymentCaptured {
                    order_id: self.id,
                    from,
                    actor_id: actor.id,
                    paid_at: clock.now(),
                }),
                super::events::PAYMENT_CAPTURED_EVENT_TYPE,
            ),
            WorkflowState::Assigned => {
                let writer = writer.ok_or_else(|| {
                    DomainError::Validation("writer_id is required to assign an order".to_owned())
                })?;
                if writer.role != ActorRole::Writer {
                    return Err(DomainError::Validation(format!(
                        "actor {} is a {}, not a writer",
                        writer.id, writer.role
                    )));
                }
                (
                    OrderEventKind::WriterAssigned(WriterAssigned {
                        order_id: self.id,
                        from,
                        writer_id: writer.id,
                        actor_id: actor.id,
                    }),
                    super::events::WRITER_ASSIGNED_EVENT_TYPE,
                )
            }
            WorkflowState::Approved | WorkflowState::ChangesRequested => (
                OrderEventKind::ReviewRecorded(ReviewRecorded {
                    order_id: self.id,
                    from,
                    outcome: target,
                    reviewer_id: actor.id,
                }),
                super::events::REVIEW_RECORDED_EVENT_TYPE,
            ),
            _ => (
                OrderEventKind::StatusChanged(StatusChanged {
                    order_id: self.id,
                    from,
                    to: target,
                    actor_id: actor.id,
                }),
                super::events::STATUS_CHANGED_EVENT_TYPE,
            ),
        };

        self.record(kind, event_type, correlation_id, clock);
        Ok(())
    }

    /// Returns the states `actor` may move the order to right now.
    #[must_use]
    pub fn allowed_transitions(&self, actor: &Actor) -> Vec<WorkflowState> {
        self.state
            .map(|current| {
                current
                    .successors()
                    .iter()
                    .copied()
                    .filter(|target| target.admits(actor, self.writer_id))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl AggregateRoot for Order {
    type Event = OrderEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        let at = event.metadata.occurred_at;
        let actor_id = match &event.kind {
            OrderEventKind::OrderPlaced(payload) => {
                self.customer_id = Some(payload.customer_id);
                self.price = Some(payload.price.clone());
                self.payment = Some(payload.payment.clone());
                self.shipping_address = payload.shipping_address.clone();
                self.product_refs.clone_from(&payload.product_refs);
                payload.customer_id
            }
            OrderEventKind::PaymentCaptured(payload) => {
                if let Some(payment) = self.payment.as_mut() {
                    payment.status = PaymentStatus::Captured;
                    payment.paid_at = Some(payload.paid_at);
                }
                payload.actor_id
            }
            OrderEventKind::WriterAssigned(payload) => {
                self.writer_id = Some(payload.writer_id);
                payload.actor_id
            }
            OrderEventKind::ReviewRecorded(payload) => {
                self.qc_id = Some(payload.reviewer_id);
                payload.reviewer_id
            }
            OrderEventKind::StatusChanged(payload) => payload.actor_id,
        };
        let state = event.kind.resulting_state();
        self.state = Some(state);
        self.status_history.push(StatusEntry {
            state,
            actor_id,
            at,
        });
        self.version += 1;
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    fn clear_uncommitted_events(&mut self) {
        self.uncommitted_events.clear();
    }
}
