//! # Lead Model
//!
//! The central entity: a prospective customer moving through the sales
//! pipeline. Carries denormalized assignment/status snapshots, an append-only
//! status history, and the broadcast sub-state consumed by the lifecycle
//! engine.
//!
//! ## Denormalized display names
//!
//! `assigned_to_name`, `accepted_by_name`, and the names inside
//! `status_history` are point-in-time snapshots. Renaming an actor or a
//! status elsewhere does not retroactively update historical leads: the
//! history is an audit trail and reflects names as they were when the action
//! happened.
//!
//! ## Mutation discipline
//!
//! The lifecycle engine is the sole writer. Every mutator here keeps the
//! broadcast invariant: a broadcast lead has no assignee and no acceptor, and
//! the moment an acceptor is recorded the broadcast flag drops and the
//! candidate set empties.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::actor::{Actor, ActorRole, Assignee, AssigneeKind};
use super::status::StatusEntry;
use crate::constants::INITIAL_STATUS;

/// What the lead is interested in: a reference into the project collection,
/// or a free-text descriptor when no project matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Interest {
    Project(Uuid),
    FreeText(String),
}

impl Interest {
    pub fn project_id(&self) -> Option<Uuid> {
        match self {
            Self::Project(id) => Some(*id),
            Self::FreeText(_) => None,
        }
    }

    /// The raw text for search matching; project references contribute their
    /// id string (the resolved title is a view concern).
    pub fn search_text(&self) -> String {
        match self {
            Self::Project(id) => id.to_string(),
            Self::FreeText(text) => text.clone(),
        }
    }
}

/// One append-only status audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub actor_id: Uuid,
    pub actor_name: String,
    pub actor_role: ActorRole,
    pub status: String,
    pub updated_at: DateTime<Utc>,
}

/// Identity stamp on a follow-up note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowUpAuthor {
    pub id: Uuid,
    pub name: String,
    pub role: ActorRole,
}

/// A follow-up note attached by an actor working the lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowUp {
    pub task: String,
    pub notes: Option<String>,
    pub follow_up_date: Option<DateTime<Utc>>,
    pub added_by: FollowUpAuthor,
    pub created_at: DateTime<Utc>,
}

/// How a lead entered a channel partner's list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    SelfLead,
    AdminAssignedLead,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub lead_id: Uuid,

    // Contact / profile
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub source: String,
    /// Intake date as supplied by the form, DD/MM/YYYY.
    pub date: String,
    pub address: Option<String>,
    pub property_type: Option<String>,
    pub requirement_type: Option<String>,
    pub budget: Option<String>,
    pub remark: Option<String>,
    pub interest: Interest,

    // Pipeline position
    pub status: String,
    pub status_ref: Option<Uuid>,
    pub status_history: Vec<StatusHistoryEntry>,
    pub follow_ups: Vec<FollowUp>,

    // Assignment
    pub assigned_to: Option<Uuid>,
    pub assigned_to_kind: Option<AssigneeKind>,
    pub assigned_to_name: Option<String>,

    // Creation provenance, immutable once set
    pub created_by_role: ActorRole,
    pub created_by_id: Uuid,
    pub created_by_name: String,

    // Broadcast sub-state
    pub is_broadcasted: bool,
    pub broadcasted_to: Vec<Uuid>,
    pub declined_by: Vec<Uuid>,
    pub accepted_by: Option<Uuid>,
    pub accepted_by_name: Option<String>,
    pub accepted_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Contact fields of a new lead, validated per creator role before the
/// engine touches the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeadDraft {
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub interested_in: String,
    pub source: String,
    pub date: String,
    pub address: Option<String>,
    pub property_type: Option<String>,
    pub requirement_type: Option<String>,
    pub budget: Option<String>,
    pub remark: Option<String>,
    pub assigned_to: Option<String>,
}

/// Action on a lead currently broadcast to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BroadcastAction {
    Accept,
    Decline,
}

/// Payload of the combined update operation. `status` and `assigned_to`
/// carry raw strings: ids are parsed by the engine so malformed references
/// surface as field-level validation errors, and `assigned_to` admits the
/// `"all"` broadcast sentinel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeadUpdate {
    pub status: Option<String>,
    pub assigned_to: Option<String>,
    pub action: Option<BroadcastAction>,
}

impl Lead {
    /// Build a fresh lead at the pipeline entry status with no history and no
    /// broadcast state. Assignment is applied separately by the engine.
    pub fn new(draft: &LeadDraft, interest: Interest, creator: &Actor) -> Self {
        let now = Utc::now();
        Self {
            lead_id: Uuid::new_v4(),
            name: draft.name.clone(),
            email: draft.email.clone(),
            phone_number: draft.phone_number.clone(),
            source: draft.source.clone(),
            date: draft.date.clone(),
            address: draft.address.clone(),
            property_type: draft.property_type.clone(),
            requirement_type: draft.requirement_type.clone(),
            budget: draft.budget.clone(),
            remark: draft.remark.clone(),
            interest,
            status: INITIAL_STATUS.to_string(),
            status_ref: None,
            status_history: Vec::new(),
            follow_ups: Vec::new(),
            assigned_to: None,
            assigned_to_kind: None,
            assigned_to_name: None,
            created_by_role: creator.role,
            created_by_id: creator.id,
            created_by_name: creator.name.clone(),
            is_broadcasted: false,
            broadcasted_to: Vec::new(),
            declined_by: Vec::new(),
            accepted_by: None,
            accepted_by_name: None,
            accepted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `actor_id` is still an undecided candidate of an open
    /// broadcast.
    pub fn is_pending_candidate(&self, actor_id: Uuid) -> bool {
        self.is_broadcasted && self.broadcasted_to.contains(&actor_id)
    }

    /// Direct assignment. Supersedes any broadcast: flag, candidate set, and
    /// acceptance fields are cleared. `declined_by` is intentionally
    /// preserved so decline history accumulates across reassignments.
    pub fn assign(&mut self, assignee: &Assignee) {
        self.assigned_to = Some(assignee.id);
        self.assigned_to_kind = Some(assignee.kind);
        self.assigned_to_name = Some(assignee.name.clone());
        self.is_broadcasted = false;
        self.broadcasted_to.clear();
        self.clear_acceptance();
        self.touch();
    }

    /// Offer the lead to a pool of candidate agents. Clears any settled
    /// assignment and acceptance.
    pub fn start_broadcast(&mut self, candidates: Vec<Uuid>) {
        self.assigned_to = None;
        self.assigned_to_kind = None;
        self.assigned_to_name = None;
        self.clear_acceptance();
        self.is_broadcasted = true;
        self.broadcasted_to = candidates;
        self.touch();
    }

    /// Settle an open broadcast onto the accepting agent. Callers enforce
    /// first-writer-wins at the storage layer; this only applies the
    /// resulting state.
    pub fn settle_acceptance(&mut self, agent: &Assignee, at: DateTime<Utc>) {
        self.accepted_by = Some(agent.id);
        self.accepted_by_name = Some(agent.name.clone());
        self.accepted_at = Some(at);
        self.assigned_to = Some(agent.id);
        self.assigned_to_kind = Some(agent.kind);
        self.assigned_to_name = Some(agent.name.clone());
        self.is_broadcasted = false;
        self.broadcasted_to.clear();
        self.touch();
    }

    /// Idempotently record an opt-out: the agent enters `declined_by` at most
    /// once and leaves the candidate set. Assignment and status are
    /// untouched.
    pub fn record_decline(&mut self, agent_id: Uuid) {
        if !self.declined_by.contains(&agent_id) {
            self.declined_by.push(agent_id);
        }
        self.broadcasted_to.retain(|id| *id != agent_id);
        self.touch();
    }

    /// Move the lead to a catalog status, appending exactly one history
    /// entry stamped with the acting identity.
    pub fn apply_status(&mut self, entry: &StatusEntry, actor: &Actor) {
        let canonical = entry.canonical_name();
        self.status = canonical.clone();
        self.status_ref = Some(entry.id);
        self.status_history.push(StatusHistoryEntry {
            actor_id: actor.id,
            actor_name: actor.name.clone(),
            actor_role: actor.role,
            status: canonical,
            updated_at: Utc::now(),
        });
        self.touch();
    }

    pub fn add_follow_up(&mut self, follow_up: FollowUp) {
        self.follow_ups.push(follow_up);
        self.touch();
    }

    /// How this lead entered the given channel partner's list.
    pub fn source_type_for(&self, partner_id: Uuid) -> SourceType {
        if self.created_by_id == partner_id {
            SourceType::SelfLead
        } else if self.created_by_role == ActorRole::Admin {
            SourceType::AdminAssignedLead
        } else {
            SourceType::Other
        }
    }

    /// Broadcast/assignment exclusivity check used by tests and debug
    /// assertions.
    pub fn broadcast_invariant_holds(&self) -> bool {
        if self.is_broadcasted {
            self.assigned_to.is_none() && self.accepted_by.is_none()
        } else {
            true
        }
    }

    fn clear_acceptance(&mut self) {
        self.accepted_by = None;
        self.accepted_by_name = None;
        self.accepted_at = None;
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// A lead prepared for display: the raw record plus the `interested_in`
/// descriptor rendered to a human-readable label (project title when the
/// reference resolves) and, in channel-partner listings, the source
/// classification.
#[derive(Debug, Clone, Serialize)]
pub struct LeadView {
    #[serde(flatten)]
    pub lead: Lead,
    pub interested_in: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_type: Option<SourceType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> LeadDraft {
        LeadDraft {
            name: "Ravi Kumar".to_string(),
            email: "ravi@example.com".to_string(),
            phone_number: "9876543210".to_string(),
            interested_in: "3BHK near the lake".to_string(),
            source: "website".to_string(),
            date: "01/08/2026".to_string(),
            ..LeadDraft::default()
        }
    }

    fn admin() -> Actor {
        Actor::new(Uuid::new_v4(), "Asha", ActorRole::Admin)
    }

    #[test]
    fn test_new_lead_starts_clean() {
        let lead = Lead::new(&draft(), Interest::FreeText("villa".into()), &admin());
        assert_eq!(lead.status, INITIAL_STATUS);
        assert!(lead.status_history.is_empty());
        assert!(!lead.is_broadcasted);
        assert!(lead.assigned_to.is_none());
        assert!(lead.broadcast_invariant_holds());
    }

    #[test]
    fn test_assign_clears_broadcast_but_keeps_declines() {
        let mut lead = Lead::new(&draft(), Interest::FreeText("villa".into()), &admin());
        let a1 = Uuid::new_v4();
        let a2 = Uuid::new_v4();
        lead.start_broadcast(vec![a1, a2]);
        lead.record_decline(a1);

        lead.assign(&Assignee::agent(a2, "Meera"));

        assert!(!lead.is_broadcasted);
        assert!(lead.broadcasted_to.is_empty());
        assert!(lead.accepted_by.is_none());
        assert_eq!(lead.declined_by, vec![a1]);
        assert_eq!(lead.assigned_to, Some(a2));
        assert_eq!(lead.assigned_to_kind, Some(AssigneeKind::Agent));
        assert!(lead.broadcast_invariant_holds());
    }

    #[test]
    fn test_broadcast_clears_assignment_and_acceptance() {
        let mut lead = Lead::new(&draft(), Interest::FreeText("villa".into()), &admin());
        let agent = Assignee::agent(Uuid::new_v4(), "Meera");
        lead.assign(&agent);

        lead.start_broadcast(vec![Uuid::new_v4(), Uuid::new_v4()]);

        assert!(lead.is_broadcasted);
        assert!(lead.assigned_to.is_none());
        assert!(lead.assigned_to_kind.is_none());
        assert!(lead.accepted_by.is_none());
        assert!(lead.broadcast_invariant_holds());
    }

    #[test]
    fn test_settle_acceptance_drains_candidates() {
        let mut lead = Lead::new(&draft(), Interest::FreeText("villa".into()), &admin());
        let winner = Uuid::new_v4();
        lead.start_broadcast(vec![winner, Uuid::new_v4()]);

        lead.settle_acceptance(&Assignee::agent(winner, "Meera"), Utc::now());

        assert!(!lead.is_broadcasted);
        assert!(lead.broadcasted_to.is_empty());
        assert_eq!(lead.accepted_by, Some(winner));
        assert_eq!(lead.assigned_to, Some(winner));
        assert!(lead.broadcast_invariant_holds());
    }

    #[test]
    fn test_decline_is_idempotent() {
        let mut lead = Lead::new(&draft(), Interest::FreeText("villa".into()), &admin());
        let agent = Uuid::new_v4();
        lead.start_broadcast(vec![agent]);

        lead.record_decline(agent);
        lead.record_decline(agent);

        assert_eq!(lead.declined_by.iter().filter(|id| **id == agent).count(), 1);
        assert!(!lead.broadcasted_to.contains(&agent));
    }

    #[test]
    fn test_apply_status_appends_history() {
        let mut lead = Lead::new(&draft(), Interest::FreeText("villa".into()), &admin());
        let actor = admin();
        let entry = StatusEntry::new(Uuid::new_v4(), "Contacted");

        lead.apply_status(&entry, &actor);

        assert_eq!(lead.status, "contacted");
        assert_eq!(lead.status_ref, Some(entry.id));
        assert_eq!(lead.status_history.len(), 1);
        assert_eq!(lead.status_history[0].status, "contacted");
        assert_eq!(lead.status_history[0].actor_id, actor.id);
    }

    #[test]
    fn test_source_type_classification() {
        let partner = Actor::new(Uuid::new_v4(), "Vikram", ActorRole::ChannelPartner);
        let lead = Lead::new(&draft(), Interest::FreeText("villa".into()), &partner);
        assert_eq!(lead.source_type_for(partner.id), SourceType::SelfLead);

        let by_admin = Lead::new(&draft(), Interest::FreeText("villa".into()), &admin());
        assert_eq!(
            by_admin.source_type_for(partner.id),
            SourceType::AdminAssignedLead
        );

        let other = Actor::new(Uuid::new_v4(), "Noor", ActorRole::Agent);
        let by_other = Lead::new(&draft(), Interest::FreeText("villa".into()), &other);
        assert_eq!(by_other.source_type_for(partner.id), SourceType::Other);
    }
}
