//! Workflow states and the transition graph.

use std::fmt;
use std::str::FromStr;

use inkwell_core::actor::{Actor, ActorRole};
use inkwell_core::error::DomainError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stage of an order's fulfillment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    /// Placed, awaiting payment capture.
    PendingPayment,
    /// Payment captured.
    Paid,
    /// A writer has been assigned.
    Assigned,
    /// The writer is working on the letter.
    WritingInProgress,
    /// The writer uploaded a draft.
    DraftUploaded,
    /// The draft is with quality control.
    QcReview,
    /// Quality control sent the draft back.
    ChangesRequested,
    /// Quality control approved the draft.
    Approved,
    /// The letter is packed.
    Packed,
    /// The letter is with the carrier.
    Shipped,
    /// Terminal: the letter arrived.
    Delivered,
    /// Terminal: the order was cancelled.
    Cancelled,
}

/// Who may move an order into a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionGate {
    /// Any actor holding one of these roles.
    Roles(&'static [ActorRole]),
    /// Only the writer currently assigned to the order.
    AssignedWriter,
}

const ADMINS: &[ActorRole] = &[ActorRole::Admin, ActorRole::SuperAdmin];
const REVIEWERS: &[ActorRole] = &[ActorRole::Qc, ActorRole::Admin, ActorRole::SuperAdmin];
const SYSTEM: &[ActorRole] = &[ActorRole::System];

impl WorkflowState {
    /// Every state, in forward order.
    pub const ALL: [Self; 12] = [
        Self::PendingPayment,
        Self::Paid,
        Self::Assigned,
        Self::WritingInProgress,
        Self::DraftUploaded,
        Self::QcReview,
        Self::ChangesRequested,
        Self::Approved,
        Self::Packed,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Returns the canonical snake-case name of the state.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PendingPayment => "pending_payment",
            Self::Paid => "paid",
            Self::Assigned => "assigned",
            Self::WritingInProgress => "writing_in_progress",
            Self::DraftUploaded => "draft_uploaded",
            Self::QcReview => "qc_review",
            Self::ChangesRequested => "changes_requested",
            Self::Approved => "approved",
            Self::Packed => "packed",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns `true` for states with no outgoing edges.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Returns the states directly reachable from `self`.
    ///
    /// `changes_requested` loops back through `writing_in_progress`; it has
    /// no direct edge to `qc_review`.
    #[must_use]
    pub fn successors(self) -> &'static [Self] {
        match self {
            Self::PendingPayment => &[Self::Paid, Self::Cancelled],
            Self::Paid => &[Self::Assigned, Self::Cancelled],
            Self::Assigned => &[Self::WritingInProgress, Self::Cancelled],
            Self::WritingInProgress => &[Self::DraftUploaded, Self::Cancelled],
            Self::DraftUploaded => &[Self::QcReview, Self::Cancelled],
            Self::QcReview => &[Self::ChangesRequested, Self::Approved, Self::Cancelled],
            Self::ChangesRequested => &[Self::WritingInProgress, Self::Cancelled],
            Self::Approved => &[Self::Packed, Self::Cancelled],
            Self::Packed => &[Self::Shipped, Self::Cancelled],
            Self::Shipped => &[Self::Delivered, Self::Cancelled],
            Self::Delivered | Self::Cancelled => &[],
        }
    }

    /// Returns `true` if `(self, target)` is an edge of the graph.
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        self.successors().contains(&target)
    }

    /// Returns who may move an order into `self`.
    ///
    /// `pending_payment` is only ever the initial state and has no gate of
    /// its own; it reports an empty role list.
    #[must_use]
    pub fn gate(self) -> TransitionGate {
        match self {
            Self::PendingPayment => TransitionGate::Roles(&[]),
            Self::Paid => TransitionGate::Roles(SYSTEM),
            Self::Assigned
            | Self::Packed
            | Self::Shipped
            | Self::Delivered
            | Self::Cancelled => TransitionGate::Roles(ADMINS),
            Self::WritingInProgress | Self::DraftUploaded | Self::QcReview => {
                TransitionGate::AssignedWriter
            }
            Self::ChangesRequested | Self::Approved => TransitionGate::Roles(REVIEWERS),
        }
    }

    /// Roles eligible to move an order into `self`. The assigned-writer gate
    /// reports the writer role; the identity check happens per order.
    #[must_use]
    pub fn eligible_roles(self) -> &'static [ActorRole] {
        match self.gate() {
            TransitionGate::Roles(roles) => roles,
            TransitionGate::AssignedWriter => &[ActorRole::Writer],
        }
    }

    /// Returns `true` if `actor` passes the gate for `self` on an order whose
    /// assigned writer is `writer_id`.
    #[must_use]
    pub fn admits(self, actor: &Actor, writer_id: Option<Uuid>) -> bool {
        match self.gate() {
            TransitionGate::Roles(roles) => roles.contains(&actor.role),
            TransitionGate::AssignedWriter => {
                actor.role == ActorRole::Writer && writer_id == Some(actor.id)
            }
        }
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| DomainError::Validation(format!("unknown workflow state: {s}")))
    }
}
