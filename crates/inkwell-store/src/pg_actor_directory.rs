//! `PostgreSQL` implementation of the `ActorDirectory` trait.

use async_trait::async_trait;
use inkwell_core::actor::{Actor, ActorDirectory, ActorRole};
use inkwell_core::error::DomainError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::infrastructure;

/// Looks actors up in the `actors` table.
#[derive(Debug, Clone)]
pub struct PgActorDirectory {
    pool: PgPool,
}

impl PgActorDirectory {
    /// Creates a new `PgActorDirectory`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts or updates an actor's role.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` on database failure.
    pub async fn upsert(&self, actor: Actor) -> Result<(), DomainError> {
        sqlx::query(
            r"
            INSERT INTO actors (actor_id, role) VALUES ($1, $2)
            ON CONFLICT (actor_id) DO UPDATE SET role = EXCLUDED.role
            ",
        )
        .bind(actor.id)
        .bind(actor.role.as_str())
        .execute(&self.pool)
        .await
        .map_err(infrastructure)?;
        Ok(())
    }
}

#[async_trait]
impl ActorDirectory for PgActorDirectory {
    async fn find_actor(&self, actor_id: Uuid) -> Result<Option<Actor>, DomainError> {
        let role: Option<String> =
            sqlx::query_scalar("SELECT role FROM actors WHERE actor_id = $1")
                .bind(actor_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(infrastructure)?;

        role.map(|role| Ok(Actor::new(actor_id, role.parse::<ActorRole>()?)))
            .transpose()
    }
}
