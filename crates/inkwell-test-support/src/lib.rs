//! Shared test mocks and utilities for the Inkwell fulfillment core.

mod actor;
mod clock;
mod repository;
mod rng;

pub use actor::InMemoryActorDirectory;
pub use clock::{FixedClock, ManualClock};
pub use repository::{EmptyEventRepository, FailingEventRepository, InMemoryEventRepository};
pub use rng::{MockRng, SequenceRng};
