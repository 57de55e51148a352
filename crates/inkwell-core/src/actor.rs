//! Actors and the directory that resolves them.
//!
//! The authorization layer in front of the core supplies an `Actor` with
//! every state-changing call. The core trusts the pair and only checks it
//! against per-operation eligibility rules.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Role attached to an actor by the authorization layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    /// A storefront customer.
    Customer,
    /// A letter writer.
    Writer,
    /// A quality-control reviewer.
    Qc,
    /// A store administrator.
    Admin,
    /// A store administrator with elevated privileges.
    SuperAdmin,
    /// An automated collaborator (payment capture, schedulers).
    System,
}

impl ActorRole {
    /// Returns the canonical snake-case name of the role.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Writer => "writer",
            Self::Qc => "qc",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
            Self::System => "system",
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActorRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "writer" => Ok(Self::Writer),
            "qc" => Ok(Self::Qc),
            "admin" => Ok(Self::Admin),
            "super_admin" => Ok(Self::SuperAdmin),
            "system" => Ok(Self::System),
            other => Err(DomainError::Validation(format!("unknown actor role: {other}"))),
        }
    }
}

/// An authenticated principal acting on the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Actor identifier.
    pub id: Uuid,
    /// Actor role.
    pub role: ActorRole,
}

impl Actor {
    /// Creates a new actor.
    #[must_use]
    pub fn new(id: Uuid, role: ActorRole) -> Self {
        Self { id, role }
    }

    /// The well-known system actor used by automated collaborators.
    #[must_use]
    pub fn system() -> Self {
        Self {
            id: Uuid::nil(),
            role: ActorRole::System,
        }
    }
}

/// Lookup of actors by identifier.
#[async_trait]
pub trait ActorDirectory: Send + Sync {
    /// Returns the actor with the given id, or `None` if it does not exist.
    async fn find_actor(&self, actor_id: Uuid) -> Result<Option<Actor>, DomainError>;
}
