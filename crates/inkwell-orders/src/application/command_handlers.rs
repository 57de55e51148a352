//! Command handlers for the Order Fulfillment context.
//!
//! Each handler loads the order stream, runs the aggregate, and appends the
//! resulting event at the version it read. A concurrent writer that got there
//! first makes the append fail with `DomainError::ConcurrencyConflict`.

use inkwell_core::actor::ActorDirectory;
use inkwell_core::aggregate::AggregateRoot;
use inkwell_core::clock::Clock;
use inkwell_core::command::Command;
use inkwell_core::error::DomainError;
use inkwell_core::event::{DomainEvent, EventMetadata};
use inkwell_core::repository::{EventRepository, StoredEvent};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::aggregates::Order;
use crate::domain::commands::{PlaceOrder, TransitionOrder};
use crate::domain::events::{OrderEvent, OrderEventKind, Payment};
use crate::domain::state::WorkflowState;

/// Result of a successfully handled command.
#[derive(Debug)]
pub struct OrderCommandResult {
    /// The aggregate ID affected by the command.
    pub aggregate_id: Uuid,
    /// The stored events produced and persisted.
    pub stored_events: Vec<StoredEvent>,
}

/// Reconstitutes an `Order` from stored events.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if event deserialization fails.
pub(crate) fn reconstitute(
    order_id: Uuid,
    existing_events: &[StoredEvent],
) -> Result<Order, DomainError> {
    let mut order = Order::new(order_id);
    for stored in existing_events {
        let kind: OrderEventKind = serde_json::from_value(stored.payload.clone()).map_err(|e| {
            DomainError::Infrastructure(format!("event deserialization failed: {e}"))
        })?;
        let event = OrderEvent {
            metadata: EventMetadata::from_stored(stored),
            kind,
        };
        order.apply(&event);
    }
    Ok(order)
}

async fn load_order(order_id: Uuid, repo: &dyn EventRepository) -> Result<Order, DomainError> {
    let existing_events = repo.load_events(order_id).await?;
    if existing_events.is_empty() {
        return Err(DomainError::AggregateNotFound(order_id));
    }
    reconstitute(order_id, &existing_events)
}

async fn persist(
    order: &Order,
    repo: &dyn EventRepository,
) -> Result<Vec<StoredEvent>, DomainError> {
    let stored_events: Vec<StoredEvent> = order
        .uncommitted_events()
        .iter()
        .map(DomainEvent::to_stored)
        .collect();

    repo.append_events(order.id, order.version(), &stored_events)
        .await?;
    Ok(stored_events)
}

/// Handles the `PlaceOrder` command: creates a new order stream in
/// `pending_payment`.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the order already exists or the
/// command carries an invalid price or payment, and `DomainError` from the
/// repository on load/append failure.
#[instrument(
    skip_all,
    fields(
        command_type = command.command_type(),
        correlation_id = %command.correlation_id(),
        order_id = %command.order_id,
    )
)]
pub async fn handle_place_order(
    command: &PlaceOrder,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
) -> Result<OrderCommandResult, DomainError> {
    let existing_events = repo.load_events(command.order_id).await?;
    let mut order = reconstitute(command.order_id, &existing_events)?;

    order.place(
        command.customer_id,
        command.price.clone(),
        Payment {
            provider_reference: command.payment_reference.clone(),
            method: command.payment_method.clone(),
            status: command.payment_status,
            paid_at: None,
        },
        command.shipping_address.clone(),
        command.product_refs.clone(),
        command.correlation_id,
        clock,
    )?;

    let stored_events = persist(&order, repo).await?;
    info!(customer_id = %command.customer_id, "order placed");

    Ok(OrderCommandResult {
        aggregate_id: command.order_id,
        stored_events,
    })
}

/// Handles the `TransitionOrder` command.
///
/// Checks run in a fixed order and stop at the first failure: the order
/// must exist, the edge must be in the graph, the actor must pass the gate,
/// and for `assigned` the writer must be given, exist, and hold the writer
/// role. On success exactly one event is appended; on any failure nothing
/// is written.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound`, `DomainError::IllegalTransition`,
/// `DomainError::Forbidden`, `DomainError::Validation`,
/// `DomainError::ActorNotFound`, or `DomainError::ConcurrencyConflict` when
/// another transition was persisted since the order was read.
#[instrument(
    skip_all,
    fields(
        command_type = command.command_type(),
        correlation_id = %command.correlation_id(),
        order_id = %command.order_id,
        target = %command.target,
        actor_role = %command.actor.role,
    )
)]
pub async fn handle_transition_order(
    command: &TransitionOrder,
    clock: &dyn Clock,
    repo: &dyn EventRepository,
    directory: &dyn ActorDirectory,
) -> Result<OrderCommandResult, DomainError> {
    let mut order = load_order(command.order_id, repo).await?;
    let from = order.check_transition(command.target, &command.actor)?;

    let writer = if command.target == WorkflowState::Assigned {
        let writer_id = command.writer_id.ok_or_else(|| {
            DomainError::Validation("writer_id is required to assign an order".to_owned())
        })?;
        let writer = directory
            .find_actor(writer_id)
            .await?
            .ok_or(DomainError::ActorNotFound(writer_id))?;
        Some(writer)
    } else {
        None
    };

    order.transition(
        command.target,
        &command.actor,
        writer.as_ref(),
        command.correlation_id,
        clock,
    )?;

    let stored_events = persist(&order, repo).await?;
    info!(%from, to = %command.target, actor_id = %command.actor.id, "order transitioned");

    Ok(OrderCommandResult {
        aggregate_id: command.order_id,
        stored_events,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use inkwell_core::actor::{Actor, ActorRole};
    use inkwell_core::error::DomainError;
    use inkwell_core::repository::{EventRepository, StoredEvent};
    use inkwell_test_support::{
        EmptyEventRepository, FailingEventRepository, FixedClock, InMemoryActorDirectory,
        InMemoryEventRepository,
    };
    use uuid::Uuid;

    use super::reconstitute;
    use crate::application::command_handlers::{handle_place_order, handle_transition_order};
    use crate::domain::commands::{PlaceOrder, TransitionOrder};
    use crate::domain::events::{Money, PaymentStatus, WRITER_ASSIGNED_EVENT_TYPE};
    use crate::domain::state::WorkflowState;

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap())
    }

    fn place_command(order_id: Uuid) -> PlaceOrder {
        PlaceOrder {
            correlation_id: Uuid::new_v4(),
            order_id,
            customer_id: Uuid::new_v4(),
            price: Money {
                amount_minor: 3_900,
                currency: "GBP".to_owned(),
            },
            payment_reference: "pi_abc".to_owned(),
            payment_method: "card".to_owned(),
            payment_status: PaymentStatus::Authorized,
            shipping_address: serde_json::json!({ "postcode": "EC1A 1BB" }),
            product_refs: vec!["letter-deluxe".to_owned()],
        }
    }

    fn transition(order_id: Uuid, target: WorkflowState, actor: Actor) -> TransitionOrder {
        TransitionOrder {
            correlation_id: Uuid::new_v4(),
            order_id,
            target,
            actor,
            writer_id: None,
        }
    }

    struct Fixture {
        repo: InMemoryEventRepository,
        directory: InMemoryActorDirectory,
        order_id: Uuid,
        admin: Actor,
        writer: Actor,
        qc: Actor,
    }

    impl Fixture {
        async fn placed() -> Self {
            let admin = Actor::new(Uuid::new_v4(), ActorRole::Admin);
            let writer = Actor::new(Uuid::new_v4(), ActorRole::Writer);
            let qc = Actor::new(Uuid::new_v4(), ActorRole::Qc);
            let fixture = Self {
                repo: InMemoryEventRepository::new(),
                directory: InMemoryActorDirectory::with_actors([admin, writer, qc]),
                order_id: Uuid::new_v4(),
                admin,
                writer,
                qc,
            };
            handle_place_order(&place_command(fixture.order_id), &clock(), &fixture.repo)
                .await
                .unwrap();
            fixture
        }

        async fn run(&self, command: TransitionOrder) -> Result<Vec<StoredEvent>, DomainError> {
            handle_transition_order(&command, &clock(), &self.repo, &self.directory)
                .await
                .map(|result| result.stored_events)
        }

        async fn advance(&self, target: WorkflowState, actor: Actor) {
            self.run(transition(self.order_id, target, actor))
                .await
                .unwrap_or_else(|e| panic!("transition to {target} failed: {e}"));
        }

        async fn assign(&self) {
            let mut command = transition(self.order_id, WorkflowState::Assigned, self.admin);
            command.writer_id = Some(self.writer.id);
            self.run(command).await.unwrap();
        }

        /// Drives the order to `qc_review`.
        async fn to_review(&self) {
            self.advance(WorkflowState::Paid, Actor::system()).await;
            self.assign().await;
            self.advance(WorkflowState::WritingInProgress, self.writer).await;
            self.advance(WorkflowState::DraftUploaded, self.writer).await;
            self.advance(WorkflowState::QcReview, self.writer).await;
        }

        fn state(&self) -> Option<WorkflowState> {
            reconstitute(self.order_id, &self.repo.events_for(self.order_id))
                .unwrap()
                .state()
        }

        fn event_count(&self) -> usize {
            self.repo.events_for(self.order_id).len()
        }
    }

    /// Serves a snapshot captured earlier for every load while appending to
    /// the live repository, so a handler acts on a stale read.
    struct StaleReadRepository<'a> {
        snapshot: Vec<StoredEvent>,
        live: &'a InMemoryEventRepository,
    }

    #[async_trait::async_trait]
    impl EventRepository for StaleReadRepository<'_> {
        async fn load_events(&self, _aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
            Ok(self.snapshot.clone())
        }

        async fn append_events(
            &self,
            aggregate_id: Uuid,
            expected_version: i64,
            events: &[StoredEvent],
        ) -> Result<(), DomainError> {
            self.live
                .append_events(aggregate_id, expected_version, events)
                .await
        }
    }

    #[tokio::test]
    async fn test_handle_place_order_creates_pending_payment_stream() {
        // Arrange
        let repo = InMemoryEventRepository::new();
        let order_id = Uuid::new_v4();

        // Act
        let result = handle_place_order(&place_command(order_id), &clock(), &repo)
            .await
            .unwrap();

        // Assert
        assert_eq!(result.aggregate_id, order_id);
        assert_eq!(result.stored_events.len(), 1);
        assert_eq!(result.stored_events[0].event_type, "order.placed");
        assert_eq!(result.stored_events[0].sequence_number, 1);
        let order = reconstitute(order_id, &repo.events_for(order_id)).unwrap();
        assert_eq!(order.state(), Some(WorkflowState::PendingPayment));
    }

    #[tokio::test]
    async fn test_handle_place_order_twice_is_rejected() {
        let fixture = Fixture::placed().await;

        let result =
            handle_place_order(&place_command(fixture.order_id), &clock(), &fixture.repo).await;

        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert_eq!(fixture.event_count(), 1);
    }

    #[tokio::test]
    async fn test_handle_place_order_propagates_repository_failure() {
        let result = handle_place_order(
            &place_command(Uuid::new_v4()),
            &clock(),
            &FailingEventRepository,
        )
        .await;

        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
    }

    #[tokio::test]
    async fn test_unknown_order_is_not_found() {
        // Arrange
        let order_id = Uuid::new_v4();
        let command = transition(order_id, WorkflowState::Paid, Actor::system());

        // Act
        let result = handle_transition_order(
            &command,
            &clock(),
            &EmptyEventRepository,
            &InMemoryActorDirectory::default(),
        )
        .await;

        // Assert
        assert!(matches!(result, Err(DomainError::AggregateNotFound(id)) if id == order_id));
    }

    #[tokio::test]
    async fn test_system_captures_payment() {
        // Arrange
        let fixture = Fixture::placed().await;

        // Act
        let events = fixture
            .run(transition(fixture.order_id, WorkflowState::Paid, Actor::system()))
            .await
            .unwrap();

        // Assert
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].sequence_number, 2);
        assert_eq!(fixture.state(), Some(WorkflowState::Paid));
    }

    #[tokio::test]
    async fn test_skipping_ahead_is_illegal_and_writes_nothing() {
        // Arrange
        let fixture = Fixture::placed().await;
        let mut command = transition(fixture.order_id, WorkflowState::Assigned, fixture.admin);
        command.writer_id = Some(fixture.writer.id);

        // Act
        let result = fixture.run(command).await;

        // Assert
        assert!(matches!(result, Err(DomainError::IllegalTransition { .. })));
        assert_eq!(fixture.state(), Some(WorkflowState::PendingPayment));
        assert_eq!(fixture.event_count(), 1);
    }

    #[tokio::test]
    async fn test_illegal_edge_is_reported_before_the_gate() {
        let fixture = Fixture::placed().await;
        let customer = Actor::new(Uuid::new_v4(), ActorRole::Customer);

        let result = fixture
            .run(transition(fixture.order_id, WorkflowState::Delivered, customer))
            .await;

        assert!(matches!(result, Err(DomainError::IllegalTransition { .. })));
    }

    #[tokio::test]
    async fn test_admin_cannot_capture_payment() {
        let fixture = Fixture::placed().await;

        let result = fixture
            .run(transition(fixture.order_id, WorkflowState::Paid, fixture.admin))
            .await;

        assert!(matches!(result, Err(DomainError::Forbidden(_))));
        assert_eq!(fixture.event_count(), 1);
    }

    #[tokio::test]
    async fn test_assign_without_writer_id_is_validation_and_order_stays_paid() {
        // Arrange
        let fixture = Fixture::placed().await;
        fixture.advance(WorkflowState::Paid, Actor::system()).await;

        // Act
        let result = fixture
            .run(transition(fixture.order_id, WorkflowState::Assigned, fixture.admin))
            .await;

        // Assert
        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert_eq!(fixture.state(), Some(WorkflowState::Paid));
        assert_eq!(fixture.event_count(), 2);
    }

    #[tokio::test]
    async fn test_assign_unknown_writer_is_actor_not_found() {
        let fixture = Fixture::placed().await;
        fixture.advance(WorkflowState::Paid, Actor::system()).await;
        let ghost = Uuid::new_v4();
        let mut command = transition(fixture.order_id, WorkflowState::Assigned, fixture.admin);
        command.writer_id = Some(ghost);

        let result = fixture.run(command).await;

        assert!(matches!(result, Err(DomainError::ActorNotFound(id)) if id == ghost));
        assert_eq!(fixture.state(), Some(WorkflowState::Paid));
    }

    #[tokio::test]
    async fn test_assign_actor_without_writer_role_is_validation() {
        let fixture = Fixture::placed().await;
        fixture.advance(WorkflowState::Paid, Actor::system()).await;
        let mut command = transition(fixture.order_id, WorkflowState::Assigned, fixture.admin);
        command.writer_id = Some(fixture.qc.id);

        let result = fixture.run(command).await;

        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert_eq!(fixture.state(), Some(WorkflowState::Paid));
    }

    #[tokio::test]
    async fn test_assign_writes_writer_and_state_in_one_event() {
        // Arrange
        let fixture = Fixture::placed().await;
        fixture.advance(WorkflowState::Paid, Actor::system()).await;
        let mut command = transition(fixture.order_id, WorkflowState::Assigned, fixture.admin);
        command.writer_id = Some(fixture.writer.id);

        // Act
        let events = fixture.run(command).await.unwrap();

        // Assert
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, WRITER_ASSIGNED_EVENT_TYPE);
        assert_eq!(
            events[0].payload["WriterAssigned"]["writer_id"],
            serde_json::json!(fixture.writer.id)
        );
        let order =
            reconstitute(fixture.order_id, &fixture.repo.events_for(fixture.order_id)).unwrap();
        assert_eq!(order.writer_id(), Some(fixture.writer.id));
        assert_eq!(order.state(), Some(WorkflowState::Assigned));
    }

    #[tokio::test]
    async fn test_unassigned_writer_is_forbidden() {
        let fixture = Fixture::placed().await;
        fixture.advance(WorkflowState::Paid, Actor::system()).await;
        fixture.assign().await;
        let other_writer = Actor::new(Uuid::new_v4(), ActorRole::Writer);

        let result = fixture
            .run(transition(
                fixture.order_id,
                WorkflowState::WritingInProgress,
                other_writer,
            ))
            .await;

        assert!(matches!(result, Err(DomainError::Forbidden(_))));
        assert_eq!(fixture.state(), Some(WorkflowState::Assigned));
    }

    #[tokio::test]
    async fn test_full_lifecycle_to_delivered() {
        // Arrange
        let fixture = Fixture::placed().await;

        // Act
        fixture.to_review().await;
        fixture.advance(WorkflowState::ChangesRequested, fixture.qc).await;
        fixture.advance(WorkflowState::WritingInProgress, fixture.writer).await;
        fixture.advance(WorkflowState::DraftUploaded, fixture.writer).await;
        fixture.advance(WorkflowState::QcReview, fixture.writer).await;
        fixture.advance(WorkflowState::Approved, fixture.admin).await;
        fixture.advance(WorkflowState::Packed, fixture.admin).await;
        fixture.advance(WorkflowState::Shipped, fixture.admin).await;
        fixture.advance(WorkflowState::Delivered, fixture.admin).await;

        // Assert
        let events = fixture.repo.events_for(fixture.order_id);
        let sequence: Vec<i64> = events.iter().map(|e| e.sequence_number).collect();
        assert_eq!(sequence, (1..=14).collect::<Vec<i64>>());
        assert_eq!(fixture.state(), Some(WorkflowState::Delivered));

        let result = fixture
            .run(transition(fixture.order_id, WorkflowState::Cancelled, fixture.admin))
            .await;
        assert!(matches!(result, Err(DomainError::IllegalTransition { .. })));
    }

    #[tokio::test]
    async fn test_admin_can_cancel_mid_review() {
        let fixture = Fixture::placed().await;
        fixture.to_review().await;

        fixture.advance(WorkflowState::Cancelled, fixture.admin).await;

        assert_eq!(fixture.state(), Some(WorkflowState::Cancelled));
    }

    #[tokio::test]
    async fn test_racing_reviews_from_the_same_read_conflict() {
        // Arrange
        let fixture = Fixture::placed().await;
        fixture.to_review().await;
        let snapshot = fixture.repo.events_for(fixture.order_id);
        let stale = StaleReadRepository {
            snapshot: snapshot.clone(),
            live: &fixture.repo,
        };

        // Act
        let approve = fixture
            .run(transition(fixture.order_id, WorkflowState::Approved, fixture.qc))
            .await;
        let send_back = handle_transition_order(
            &transition(fixture.order_id, WorkflowState::ChangesRequested, fixture.admin),
            &clock(),
            &stale,
            &fixture.directory,
        )
        .await;

        // Assert
        assert!(approve.is_ok());
        match send_back.unwrap_err() {
            DomainError::ConcurrencyConflict {
                expected, actual, ..
            } => {
                assert_eq!(expected, i64::try_from(snapshot.len()).unwrap());
                assert_eq!(actual, expected + 1);
            }
            other => panic!("expected ConcurrencyConflict, got {other:?}"),
        }
        assert_eq!(fixture.state(), Some(WorkflowState::Approved));
        assert_eq!(fixture.event_count(), snapshot.len() + 1);
    }
}
