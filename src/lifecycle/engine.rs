//! # Lead Lifecycle Engine
//!
//! The single writer of lead state. Every transition (create, assign,
//! broadcast, accept, decline, status change) funnels through here, with
//! the authorization gate and payload validation running before any
//! mutation and notification fan-out running after.
//!
//! ## The combined update
//!
//! `update` is a gate plus three mutually-exclusive sub-transitions:
//!
//! - **A, broadcast accept/decline**: taken only when the lead is currently
//!   broadcast and the caller is still an undecided candidate. Acceptance is
//!   first-writer-wins, enforced by a conditional write at the storage layer
//!   (see [`LeadStore::try_accept`]); decline is an idempotent opt-out. When
//!   A applies, B and C are skipped for that call.
//! - **B, status update**: the supplied id must reference a live catalog
//!   entry; applying it appends exactly one history entry.
//! - **C, assignment update**: the `"all"` sentinel broadcasts to every
//!   active agent; anything else is resolved through the directory's dual
//!   lookup. A direct assignment always supersedes broadcast state.
//!
//! B and C may both apply in one call.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::constants::{events, BROADCAST_ALL, INTAKE_DATE_FORMAT};
use crate::error::{LeadError, Result};
use crate::logging::log_lead_operation;
use crate::models::{
    Actor, ActorRole, Assignee, BroadcastAction, FollowUp, FollowUpAuthor, Interest, Lead,
    LeadDraft, LeadUpdate, LeadView,
};
use crate::notify::{Notifier, NotifyTarget};
use crate::store::{
    AcceptOutcome, AssigneeDirectory, LeadQuery, LeadScope, LeadStore, Page, ProjectDirectory,
    StatusCatalog,
};
use crate::validation;

use super::roles::policy_for;
use super::summary::StatusBreakdown;

/// Free-text search and status filter shared by the listing operations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListFilter {
    pub q: Option<String>,
    pub status: Option<String>,
}

/// Admin listing: the filtered leads and their status breakdown.
#[derive(Debug, Serialize)]
pub struct LeadListing {
    pub results: Vec<LeadView>,
    #[serde(flatten)]
    pub breakdown: StatusBreakdown,
}

/// Channel-partner listing, with the source classification counts the
/// partner dashboard shows.
#[derive(Debug, Serialize)]
pub struct PartnerLeadListing {
    pub results: Vec<LeadView>,
    #[serde(flatten)]
    pub breakdown: StatusBreakdown,
    pub self_lead_count: u64,
    pub admin_assigned_lead_count: u64,
}

/// Agent listing, with the count of broadcast leads this agent won.
#[derive(Debug, Serialize)]
pub struct AgentLeadListing {
    pub results: Vec<LeadView>,
    #[serde(flatten)]
    pub breakdown: StatusBreakdown,
    pub accepted_broadcast_count: u64,
}

/// One page of the admin broadcast listing.
#[derive(Debug, Serialize)]
pub struct BroadcastPage {
    pub results: Vec<LeadView>,
    pub total_items: u64,
    pub current_page: u32,
    pub total_pages: u64,
}

/// Follow-up creation payload. The date arrives DD/MM/YYYY like the intake
/// forms.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FollowUpInput {
    pub task: String,
    pub notes: Option<String>,
    pub follow_up_date: Option<String>,
}

/// A follow-up joined back to its lead for the "my follow-ups" view.
#[derive(Debug, Serialize)]
pub struct FollowUpSummary {
    pub lead_id: Uuid,
    pub lead_name: String,
    pub task: String,
    pub notes: Option<String>,
    pub follow_up_date: Option<DateTime<Utc>>,
}

/// The lifecycle engine. Cheap to clone; collaborators are shared.
#[derive(Clone)]
pub struct LeadLifecycle {
    store: Arc<dyn LeadStore>,
    directory: Arc<dyn AssigneeDirectory>,
    catalog: Arc<dyn StatusCatalog>,
    projects: Arc<dyn ProjectDirectory>,
    notifier: Notifier,
}

impl LeadLifecycle {
    pub fn new(
        store: Arc<dyn LeadStore>,
        directory: Arc<dyn AssigneeDirectory>,
        catalog: Arc<dyn StatusCatalog>,
        projects: Arc<dyn ProjectDirectory>,
        notifier: Notifier,
    ) -> Self {
        Self {
            store,
            directory,
            catalog,
            projects,
            notifier,
        }
    }

    /// The fan-out publisher, for socket gateways to subscribe to.
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    pub async fn create(&self, actor: &Actor, draft: LeadDraft) -> Result<LeadView> {
        validation::validate_lead_draft(actor.role, &draft)?;

        if self.store.find_by_email(&draft.email).await?.is_some() {
            return Err(LeadError::conflict("A lead with this email already exists."));
        }

        let interest = self.resolve_interest(&draft.interested_in).await?;

        let policy = policy_for(actor.role);
        let assignee = policy
            .resolve_assignment(actor, draft.assigned_to.as_deref(), self.directory.as_ref())
            .await?;

        let mut lead = Lead::new(&draft, interest, actor);
        if let Some(assignee) = &assignee {
            lead.assign(assignee);
        }

        let lead = self.store.insert(lead).await?;

        log_lead_operation(
            "create",
            Some(lead.lead_id),
            Some(actor.id),
            Some(&actor.role.to_string()),
            "created",
            lead.assigned_to_name.as_deref(),
        );

        if let Some(assignee) = &assignee {
            if assignee.id != actor.id {
                self.notifier.publish(
                    NotifyTarget::Actor(assignee.id),
                    events::LEAD_ASSIGNED,
                    json!({
                        "lead_id": lead.lead_id,
                        "name": lead.name,
                        "status": lead.status,
                        "assigned_by": actor.name,
                    }),
                );
            }
        }

        self.view(lead, None).await
    }

    // ------------------------------------------------------------------
    // Combined update
    // ------------------------------------------------------------------

    /// Combined authorization gate plus the three sub-transitions. The
    /// `channel_role` is the role the invoking endpoint is partitioned for;
    /// callers of another role are rejected regardless of ownership.
    pub async fn update(
        &self,
        actor: &Actor,
        channel_role: ActorRole,
        lead_id: Uuid,
        update: LeadUpdate,
    ) -> Result<LeadView> {
        validation::validate_lead_update(&update)?;

        let lead = self
            .store
            .find_by_id(lead_id)
            .await?
            .ok_or_else(|| LeadError::not_found("Lead not found"))?;

        if actor.role != channel_role {
            return Err(LeadError::authorization(format!(
                "Access denied: only {channel_role} updates are allowed here"
            )));
        }

        let policy = policy_for(actor.role);
        policy.authorize_update(actor, &lead)?;

        // Sub-transition A is exclusive: a pending candidate can only
        // accept or decline, never slip a status or assignment change in.
        if actor.role == ActorRole::Agent && lead.is_pending_candidate(actor.id) {
            return match update.action {
                Some(BroadcastAction::Accept) => self.accept_pending(actor, &lead).await,
                Some(BroadcastAction::Decline) => self.decline_pending(actor, &lead).await,
                None => Err(LeadError::validation(
                    "This lead is broadcast to you: action must be accept or decline",
                )),
            };
        }

        if update.action.is_some() {
            return Err(LeadError::validation(
                "action is only valid for a lead currently broadcast to you",
            ));
        }

        let mut lead = lead;
        let mut status_applied: Option<String> = None;
        let mut broadcast_pool: Vec<Assignee> = Vec::new();
        let mut direct_assignee: Option<Assignee> = None;

        // Sub-transition B: status update
        if let Some(raw_status) = &update.status {
            let status_id = Uuid::parse_str(raw_status.trim())
                .map_err(|_| LeadError::validation("Invalid status ID"))?;
            let entry = self
                .catalog
                .find_active(status_id)
                .await?
                .ok_or_else(|| LeadError::not_found("Status not found"))?;
            lead.apply_status(&entry, actor);
            status_applied = Some(entry.canonical_name());
        }

        // Sub-transition C: assignment update or broadcast
        if let Some(raw_target) = &update.assigned_to {
            if raw_target.trim() == BROADCAST_ALL {
                let agents = self.directory.find_active_agents().await?;
                if agents.is_empty() {
                    return Err(LeadError::validation(
                        "No active agents available to broadcast to",
                    ));
                }
                lead.start_broadcast(agents.iter().map(|a| a.id).collect());
                broadcast_pool = agents;
            } else {
                let target_id = Uuid::parse_str(raw_target.trim())
                    .map_err(|_| LeadError::validation("Invalid assigned_to ID"))?;
                let assignee = self.directory.find_assignable(target_id).await?.ok_or_else(
                    || LeadError::not_found("Assigned user not found in agents or channel partners"),
                )?;
                lead.assign(&assignee);
                direct_assignee = Some(assignee);
            }
        }

        let lead = self.store.save(&lead).await?;

        log_lead_operation(
            "update",
            Some(lead.lead_id),
            Some(actor.id),
            Some(&actor.role.to_string()),
            &lead.status,
            status_applied.as_deref(),
        );

        for candidate in &broadcast_pool {
            self.notifier.publish(
                NotifyTarget::Actor(candidate.id),
                events::LEAD_BROADCASTED,
                json!({
                    "lead_id": lead.lead_id,
                    "name": lead.name,
                    "status": lead.status,
                    "source": lead.source,
                    "broadcasted_by": actor.name,
                }),
            );
        }

        if let Some(assignee) = &direct_assignee {
            if assignee.id != actor.id {
                self.notifier.publish(
                    NotifyTarget::Actor(assignee.id),
                    events::LEAD_ASSIGNED,
                    json!({
                        "lead_id": lead.lead_id,
                        "name": lead.name,
                        "status": lead.status,
                        "assigned_by": actor.name,
                    }),
                );
            }
        }

        if let Some(status) = status_applied {
            self.notifier.publish(
                NotifyTarget::Admins,
                events::LEAD_STATUS_CHANGED,
                json!({
                    "lead_id": lead.lead_id,
                    "name": lead.name,
                    "status": status,
                    "changed_by": actor.name,
                    "changed_by_role": actor.role,
                }),
            );
        }

        self.view(lead, None).await
    }

    // ------------------------------------------------------------------
    // Broadcast accept / decline
    // ------------------------------------------------------------------

    /// Standalone agent shortcut for accepting a broadcast lead.
    pub async fn accept(&self, actor: &Actor, lead_id: Uuid) -> Result<LeadView> {
        self.ensure_role(actor, ActorRole::Agent, "Only agents can accept broadcast leads")?;

        let lead = self
            .store
            .find_by_id(lead_id)
            .await?
            .ok_or_else(|| LeadError::not_found("Lead not found"))?;

        if lead.accepted_by.is_some() {
            let holder = lead
                .accepted_by_name
                .as_deref()
                .unwrap_or("another agent");
            return Err(LeadError::conflict(format!(
                "Lead already accepted by {holder}"
            )));
        }
        if !lead.is_pending_candidate(actor.id) {
            return Err(LeadError::authorization(
                "Access denied: this lead is not broadcast to you",
            ));
        }

        self.accept_pending(actor, &lead).await
    }

    /// Standalone agent shortcut for declining a broadcast lead.
    pub async fn decline(&self, actor: &Actor, lead_id: Uuid) -> Result<LeadView> {
        self.ensure_role(actor, ActorRole::Agent, "Only agents can decline broadcast leads")?;

        let lead = self
            .store
            .find_by_id(lead_id)
            .await?
            .ok_or_else(|| LeadError::not_found("Lead not found"))?;

        // Re-declining while the broadcast is still open is a no-op, not an
        // error; anything else is not the caller's to decline.
        let declinable = lead.is_broadcasted
            && (lead.broadcasted_to.contains(&actor.id) || lead.declined_by.contains(&actor.id));
        if !declinable {
            return Err(LeadError::authorization(
                "Access denied: this lead is not broadcast to you",
            ));
        }

        self.decline_pending(actor, &lead).await
    }

    /// Settle an open broadcast on the caller. `lead` is the caller's read
    /// snapshot: the candidate pool notified below comes from it, while the
    /// race itself is decided by the store's conditional write.
    async fn accept_pending(&self, actor: &Actor, lead: &Lead) -> Result<LeadView> {
        let me = Assignee::agent(actor.id, actor.name.clone());

        // Everyone else the broadcast reached hears that the lead is gone:
        // candidates still pending and candidates who already declined.
        let mut pool: Vec<Uuid> = lead.broadcasted_to.clone();
        for candidate in &lead.declined_by {
            if !pool.contains(candidate) {
                pool.push(*candidate);
            }
        }

        match self.store.try_accept(lead.lead_id, &me).await? {
            AcceptOutcome::Accepted(updated) => {
                log_lead_operation(
                    "accept",
                    Some(updated.lead_id),
                    Some(actor.id),
                    Some("agent"),
                    &updated.status,
                    None,
                );

                for candidate in pool.iter().filter(|id| **id != actor.id) {
                    self.notifier.publish(
                        NotifyTarget::Actor(*candidate),
                        events::LEAD_TAKEN,
                        json!({
                            "lead_id": updated.lead_id,
                            "name": updated.name,
                            "accepted_by_name": actor.name,
                        }),
                    );
                }
                self.notifier.publish(
                    NotifyTarget::Admins,
                    events::LEAD_ACCEPTED,
                    json!({
                        "lead_id": updated.lead_id,
                        "name": updated.name,
                        "accepted_by": actor.id,
                        "accepted_by_name": actor.name,
                    }),
                );

                self.view(updated, None).await
            }
            AcceptOutcome::AlreadyTaken(current) => {
                let holder = current
                    .accepted_by_name
                    .clone()
                    .unwrap_or_else(|| "another agent".to_string());
                Err(LeadError::conflict(format!(
                    "Lead already accepted by {holder}"
                )))
            }
        }
    }

    async fn decline_pending(&self, actor: &Actor, lead: &Lead) -> Result<LeadView> {
        let updated = self.store.append_decline(lead.lead_id, actor.id).await?;

        log_lead_operation(
            "decline",
            Some(updated.lead_id),
            Some(actor.id),
            Some("agent"),
            &updated.status,
            None,
        );

        self.notifier.publish(
            NotifyTarget::Admins,
            events::LEAD_DECLINED,
            json!({
                "lead_id": updated.lead_id,
                "name": updated.name,
                "declined_by": actor.id,
                "declined_by_name": actor.name,
            }),
        );

        self.view(updated, None).await
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub async fn get(&self, lead_id: Uuid) -> Result<LeadView> {
        let lead = self
            .store
            .find_by_id(lead_id)
            .await?
            .ok_or_else(|| LeadError::not_found("Lead not found"))?;
        self.view(lead, None).await
    }

    pub async fn list_for_admin(&self, actor: &Actor, filter: &ListFilter) -> Result<LeadListing> {
        self.ensure_role(actor, ActorRole::Admin, "Access denied: admin only")?;
        let query = LeadQuery::scoped(LeadScope::All)
            .with_status(filter.status.clone())
            .with_search(filter.q.clone());
        let leads = self.store.list(&query).await?;
        let breakdown = self.breakdown_for(&leads).await?;
        Ok(LeadListing {
            results: self.views(leads, None).await?,
            breakdown,
        })
    }

    pub async fn list_for_agent(
        &self,
        actor: &Actor,
        filter: &ListFilter,
    ) -> Result<AgentLeadListing> {
        self.ensure_role(actor, ActorRole::Agent, "Access denied: agent only")?;
        let query = LeadQuery::scoped(LeadScope::VisibleToAgent(actor.id))
            .with_status(filter.status.clone())
            .with_search(filter.q.clone());
        let leads = self.store.list(&query).await?;
        let breakdown = self.breakdown_for(&leads).await?;
        let accepted_broadcast_count = self
            .store
            .count(&LeadQuery::scoped(LeadScope::AcceptedBroadcastBy(actor.id)))
            .await?;
        Ok(AgentLeadListing {
            results: self.views(leads, None).await?,
            breakdown,
            accepted_broadcast_count,
        })
    }

    pub async fn list_for_channel_partner(
        &self,
        actor: &Actor,
        filter: &ListFilter,
    ) -> Result<PartnerLeadListing> {
        self.ensure_role(
            actor,
            ActorRole::ChannelPartner,
            "Access denied: channel partner only",
        )?;
        let query = LeadQuery::scoped(LeadScope::VisibleToChannelPartner(actor.id))
            .with_status(filter.status.clone())
            .with_search(filter.q.clone());
        let leads = self.store.list(&query).await?;
        let breakdown = self.breakdown_for(&leads).await?;

        let self_lead_count = leads
            .iter()
            .filter(|l| l.source_type_for(actor.id) == crate::models::SourceType::SelfLead)
            .count() as u64;
        let admin_assigned_lead_count = leads
            .iter()
            .filter(|l| {
                l.source_type_for(actor.id) == crate::models::SourceType::AdminAssignedLead
            })
            .count() as u64;

        Ok(PartnerLeadListing {
            results: self.views(leads, Some(actor.id)).await?,
            breakdown,
            self_lead_count,
            admin_assigned_lead_count,
        })
    }

    pub async fn list_broadcasted(
        &self,
        actor: &Actor,
        page: Page,
    ) -> Result<BroadcastPage> {
        self.ensure_role(actor, ActorRole::Admin, "Access denied: admin only")?;
        let unpaged = LeadQuery::scoped(LeadScope::Broadcasted);
        let total_items = self.store.count(&unpaged).await?;
        let leads = self.store.list(&unpaged.clone().with_page(page)).await?;
        Ok(BroadcastPage {
            results: self.views(leads, None).await?,
            total_items,
            current_page: page.page,
            total_pages: page.total_pages(total_items),
        })
    }

    /// Admin drill-down: every lead settled on one agent.
    pub async fn list_for_assigned_agent(
        &self,
        actor: &Actor,
        agent_id: Uuid,
    ) -> Result<LeadListing> {
        self.ensure_role(actor, ActorRole::Admin, "Access denied: admin only")?;
        let query = LeadQuery::scoped(LeadScope::AssignedAgent(agent_id));
        let leads = self.store.list(&query).await?;
        let breakdown = self.breakdown_for(&leads).await?;
        Ok(LeadListing {
            results: self.views(leads, None).await?,
            breakdown,
        })
    }

    // ------------------------------------------------------------------
    // Follow-ups
    // ------------------------------------------------------------------

    pub async fn add_follow_up(
        &self,
        actor: &Actor,
        lead_id: Uuid,
        input: FollowUpInput,
    ) -> Result<FollowUp> {
        if input.task.trim().is_empty() {
            return Err(LeadError::validation("task is required"));
        }
        let follow_up_date = input
            .follow_up_date
            .as_deref()
            .map(|raw| -> Result<DateTime<Utc>> {
                validation::check_intake_date(raw)?;
                let date = NaiveDate::parse_from_str(raw.trim(), INTAKE_DATE_FORMAT)
                    .map_err(|_| LeadError::validation("follow_up_date must be in DD/MM/YYYY format"))?;
                let midnight = date
                    .and_hms_opt(0, 0, 0)
                    .ok_or_else(|| LeadError::internal("invalid midnight timestamp"))?;
                Ok(DateTime::from_naive_utc_and_offset(midnight, Utc))
            })
            .transpose()?;

        let mut lead = self
            .store
            .find_by_id(lead_id)
            .await?
            .ok_or_else(|| LeadError::not_found("Lead not found"))?;

        let follow_up = FollowUp {
            task: input.task.trim().to_string(),
            notes: input.notes,
            follow_up_date,
            added_by: FollowUpAuthor {
                id: actor.id,
                name: actor.name.clone(),
                role: actor.role,
            },
            created_at: Utc::now(),
        };
        lead.add_follow_up(follow_up.clone());
        self.store.save(&lead).await?;

        Ok(follow_up)
    }

    pub async fn my_follow_ups(&self, actor: &Actor) -> Result<Vec<FollowUpSummary>> {
        let leads = self
            .store
            .list(&LeadQuery::scoped(LeadScope::FollowUpAuthor(actor.id)))
            .await?;

        let mut summaries = Vec::new();
        for lead in leads {
            for follow_up in lead
                .follow_ups
                .iter()
                .filter(|f| f.added_by.id == actor.id)
            {
                summaries.push(FollowUpSummary {
                    lead_id: lead.lead_id,
                    lead_name: lead.name.clone(),
                    task: follow_up.task.clone(),
                    notes: follow_up.notes.clone(),
                    follow_up_date: follow_up.follow_up_date,
                });
            }
        }
        Ok(summaries)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn ensure_role(&self, actor: &Actor, expected: ActorRole, denial: &str) -> Result<()> {
        if actor.role == expected {
            Ok(())
        } else {
            Err(LeadError::authorization(denial))
        }
    }

    async fn resolve_interest(&self, raw: &str) -> Result<Interest> {
        let trimmed = raw.trim();
        if let Ok(project_id) = Uuid::parse_str(trimmed) {
            if !self.projects.exists(project_id).await? {
                return Err(LeadError::validation(
                    "Invalid project ID provided in interested_in field",
                ));
            }
            return Ok(Interest::Project(project_id));
        }
        if trimmed.len() < crate::constants::MIN_INTEREST_TEXT_LEN {
            return Err(LeadError::validation(
                "Please provide a valid project name in interested_in",
            ));
        }
        Ok(Interest::FreeText(trimmed.to_string()))
    }

    async fn breakdown_for(&self, leads: &[Lead]) -> Result<StatusBreakdown> {
        let catalog = self.catalog.list_active().await?;
        Ok(StatusBreakdown::compute(leads, &catalog))
    }

    async fn view(&self, lead: Lead, partner_scope: Option<Uuid>) -> Result<LeadView> {
        let interested_in = match &lead.interest {
            Interest::Project(id) => self
                .projects
                .title(*id)
                .await?
                .unwrap_or_else(|| id.to_string()),
            Interest::FreeText(text) => text.clone(),
        };
        let source_type = partner_scope.map(|partner_id| lead.source_type_for(partner_id));
        Ok(LeadView {
            lead,
            interested_in,
            source_type,
        })
    }

    async fn views(&self, leads: Vec<Lead>, partner_scope: Option<Uuid>) -> Result<Vec<LeadView>> {
        // Project titles repeat heavily across a listing; resolve each
        // reference once.
        let mut titles: HashMap<Uuid, Option<String>> = HashMap::new();
        let mut views = Vec::with_capacity(leads.len());
        for lead in leads {
            let interested_in = match &lead.interest {
                Interest::Project(id) => {
                    let title = match titles.get(id) {
                        Some(cached) => cached.clone(),
                        None => {
                            let fetched = self.projects.title(*id).await?;
                            titles.insert(*id, fetched.clone());
                            fetched
                        }
                    };
                    title.unwrap_or_else(|| id.to_string())
                }
                Interest::FreeText(text) => text.clone(),
            };
            let source_type = partner_scope.map(|partner_id| lead.source_type_for(partner_id));
            views.push(LeadView {
                lead,
                interested_in,
                source_type,
            });
        }
        Ok(views)
    }
}
