//! Test actor directory — in-memory `ActorDirectory` for tests.

use std::collections::HashMap;

use async_trait::async_trait;
use inkwell_core::actor::{Actor, ActorDirectory};
use inkwell_core::error::DomainError;
use uuid::Uuid;

/// An actor directory backed by a fixed map.
#[derive(Debug, Default)]
pub struct InMemoryActorDirectory {
    actors: HashMap<Uuid, Actor>,
}

impl InMemoryActorDirectory {
    /// Create a directory containing `actors`.
    #[must_use]
    pub fn with_actors(actors: impl IntoIterator<Item = Actor>) -> Self {
        Self {
            actors: actors.into_iter().map(|a| (a.id, a)).collect(),
        }
    }
}

#[async_trait]
impl ActorDirectory for InMemoryActorDirectory {
    async fn find_actor(&self, actor_id: Uuid) -> Result<Option<Actor>, DomainError> {
        Ok(self.actors.get(&actor_id).copied())
    }
}
