//! Actor references
//!
//! Who changed something: a user (the requester), an employee, or an admin.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Id;

/// Kind of actor, persisted as `changedByModel` / `byModel`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorKind {
    User,
    Employee,
    Admin,
}

impl ActorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Employee => "Employee",
            Self::Admin => "Admin",
        }
    }
}

impl fmt::Display for ActorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActorKind {
    type Err = String;

    /// Accepts both the persisted form (`Employee`) and the header form (`employee`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "employee" => Ok(Self::Employee),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown actor kind: {}", other)),
        }
    }
}

/// Typed reference to an actor record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorRef {
    pub kind: ActorKind,
    pub id: Id,
}

impl ActorRef {
    pub fn user(id: Id) -> Self {
        Self {
            kind: ActorKind::User,
            id,
        }
    }

    pub fn employee(id: Id) -> Self {
        Self {
            kind: ActorKind::Employee,
            id,
        }
    }

    pub fn admin(id: Id) -> Self {
        Self {
            kind: ActorKind::Admin,
            id,
        }
    }
}

/// An actor with the display name used in comments and notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    #[serde(flatten)]
    pub reference: ActorRef,
    pub name: String,
}

impl Actor {
    pub fn new(reference: ActorRef, name: impl Into<String>) -> Self {
        Self {
            reference,
            name: name.into(),
        }
    }

    pub fn employee(id: Id, name: impl Into<String>) -> Self {
        Self::new(ActorRef::employee(id), name)
    }

    pub fn admin(id: Id, name: impl Into<String>) -> Self {
        Self::new(ActorRef::admin(id), name)
    }

    pub fn user(id: Id, name: impl Into<String>) -> Self {
        Self::new(ActorRef::user(id), name)
    }

    pub fn id(&self) -> Id {
        self.reference.id
    }

    pub fn kind(&self) -> ActorKind {
        self.reference.kind
    }
}
