//! # Actor Types
//!
//! Authenticated actors (admin, agent, channel partner) and assignable
//! targets. Actor records themselves live in the external directory; the
//! engine only carries id, display name, and role.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Role of an authenticated actor. Any wire value outside these three is
/// rejected at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Admin,
    Agent,
    ChannelPartner,
}

impl ActorRole {
    /// Whether actors of this role may appear as a lead assignee.
    pub fn is_assignable(&self) -> bool {
        matches!(self, Self::Agent | Self::ChannelPartner)
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Agent => write!(f, "agent"),
            Self::ChannelPartner => write!(f, "channel_partner"),
        }
    }
}

impl std::str::FromStr for ActorRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "agent" => Ok(Self::Agent),
            "channel_partner" => Ok(Self::ChannelPartner),
            _ => Err(format!("Invalid actor role: {s}")),
        }
    }
}

/// An authenticated caller, as delivered by the upstream auth gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub name: String,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(id: Uuid, name: impl Into<String>, role: ActorRole) -> Self {
        Self {
            id,
            name: name.into(),
            role,
        }
    }
}

/// Which directory collection an assignee resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssigneeKind {
    Agent,
    ChannelPartner,
}

impl fmt::Display for AssigneeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Agent => write!(f, "agent"),
            Self::ChannelPartner => write!(f, "channel_partner"),
        }
    }
}

impl std::str::FromStr for AssigneeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "agent" => Ok(Self::Agent),
            "channel_partner" => Ok(Self::ChannelPartner),
            _ => Err(format!("Invalid assignee kind: {s}")),
        }
    }
}

/// A resolvable assignment target. Produced by the directory's dual lookup
/// (agents first, then channel partners), never constructed from raw input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignee {
    pub id: Uuid,
    pub name: String,
    pub kind: AssigneeKind,
}

impl Assignee {
    pub fn agent(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: AssigneeKind::Agent,
        }
    }

    pub fn channel_partner(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: AssigneeKind::ChannelPartner,
        }
    }
}
