//! # Role Policies
//!
//! The closed set of actor roles, expressed as polymorphic capabilities
//! instead of scattered role branching: each policy answers how its role is
//! authorized against a lead, how its list queries are scoped, and how it
//! resolves an assignment target at intake. Operations select a policy once
//! at entry and never branch on the role again.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{LeadError, Result};
use crate::models::{Actor, ActorRole, Assignee, Lead};
use crate::store::{AssigneeDirectory, LeadScope};

#[async_trait]
pub trait RolePolicy: Send + Sync {
    fn role(&self) -> ActorRole;

    /// Ownership gate for the combined update operation. Runs before any
    /// mutation; denial messages stay generic so other actors' assignment
    /// details never leak.
    fn authorize_update(&self, actor: &Actor, lead: &Lead) -> Result<()>;

    /// Visibility scope for this role's list queries.
    fn scope(&self, actor: &Actor) -> LeadScope;

    /// Resolve the `assigned_to` intake field for this role.
    async fn resolve_assignment(
        &self,
        actor: &Actor,
        requested: Option<&str>,
        directory: &dyn AssigneeDirectory,
    ) -> Result<Option<Assignee>>;
}

fn parse_assignee_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| LeadError::validation("Invalid assigned_to: not a valid id"))
}

async fn dual_lookup(id: Uuid, directory: &dyn AssigneeDirectory) -> Result<Assignee> {
    directory.find_assignable(id).await?.ok_or_else(|| {
        LeadError::validation("Invalid assigned_to: no matching agent or channel partner found")
    })
}

pub struct AdminPolicy;

#[async_trait]
impl RolePolicy for AdminPolicy {
    fn role(&self) -> ActorRole {
        ActorRole::Admin
    }

    fn authorize_update(&self, _actor: &Actor, _lead: &Lead) -> Result<()> {
        Ok(())
    }

    fn scope(&self, _actor: &Actor) -> LeadScope {
        LeadScope::All
    }

    async fn resolve_assignment(
        &self,
        _actor: &Actor,
        requested: Option<&str>,
        directory: &dyn AssigneeDirectory,
    ) -> Result<Option<Assignee>> {
        match requested {
            Some(raw) => {
                let id = parse_assignee_id(raw)?;
                Ok(Some(dual_lookup(id, directory).await?))
            }
            None => Ok(None),
        }
    }
}

pub struct AgentPolicy;

#[async_trait]
impl RolePolicy for AgentPolicy {
    fn role(&self) -> ActorRole {
        ActorRole::Agent
    }

    fn authorize_update(&self, actor: &Actor, lead: &Lead) -> Result<()> {
        let owns = lead.created_by_id == actor.id
            || lead.assigned_to == Some(actor.id)
            || lead.is_pending_candidate(actor.id);
        if owns {
            Ok(())
        } else {
            Err(LeadError::authorization("Access denied: this lead is not yours"))
        }
    }

    fn scope(&self, actor: &Actor) -> LeadScope {
        LeadScope::VisibleToAgent(actor.id)
    }

    /// Agents always self-assign; a caller-supplied target is stripped.
    async fn resolve_assignment(
        &self,
        actor: &Actor,
        _requested: Option<&str>,
        _directory: &dyn AssigneeDirectory,
    ) -> Result<Option<Assignee>> {
        Ok(Some(Assignee::agent(actor.id, actor.name.clone())))
    }
}

pub struct ChannelPartnerPolicy;

#[async_trait]
impl RolePolicy for ChannelPartnerPolicy {
    fn role(&self) -> ActorRole {
        ActorRole::ChannelPartner
    }

    fn authorize_update(&self, actor: &Actor, lead: &Lead) -> Result<()> {
        let owns = lead.created_by_id == actor.id
            || lead.assigned_to == Some(actor.id)
            || (lead.created_by_role == ActorRole::ChannelPartner
                && lead.created_by_id == actor.id);
        if owns {
            Ok(())
        } else {
            Err(LeadError::authorization(
                "Access denied: this lead does not belong to you",
            ))
        }
    }

    fn scope(&self, actor: &Actor) -> LeadScope {
        LeadScope::VisibleToChannelPartner(actor.id)
    }

    async fn resolve_assignment(
        &self,
        _actor: &Actor,
        requested: Option<&str>,
        directory: &dyn AssigneeDirectory,
    ) -> Result<Option<Assignee>> {
        let raw = requested
            .ok_or_else(|| LeadError::validation("assigned_to is required"))?;
        let id = parse_assignee_id(raw)?;
        Ok(Some(dual_lookup(id, directory).await?))
    }
}

/// Select the policy for a role. The set is closed; policies are stateless.
pub fn policy_for(role: ActorRole) -> &'static dyn RolePolicy {
    match role {
        ActorRole::Admin => &AdminPolicy,
        ActorRole::Agent => &AgentPolicy,
        ActorRole::ChannelPartner => &ChannelPartnerPolicy,
    }
}
