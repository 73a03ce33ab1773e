//! # Store Contracts
//!
//! Behavioral contracts for everything the lifecycle engine reads or writes:
//! the lead store (sole mutable resource), the assignee directory, the status
//! catalog, and the project directory. The engine depends on these traits
//! only; Postgres implementations live in [`postgres`], an in-memory
//! implementation for embedded use and tests in [`memory`].
//!
//! ## Acceptance atomicity
//!
//! [`LeadStore::try_accept`] is the one operation with cross-request
//! atomicity requirements: implementations must resolve the accept race with
//! a single conditional write guarded on the acceptance field still being
//! unset, never with a read-then-write sequence.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Assignee, Lead, StatusEntry};

/// Outcome of a conditional acceptance attempt.
#[derive(Debug, Clone)]
pub enum AcceptOutcome {
    /// The caller won the race; the returned lead is settled on them.
    Accepted(Lead),
    /// Another agent got there first; the returned lead names the holder.
    AlreadyTaken(Lead),
}

/// 1-based pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub per_page: u32,
}

impl Page {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }

    pub fn total_pages(&self, total_items: u64) -> u64 {
        total_items.div_ceil(u64::from(self.per_page))
    }
}

/// Role-derived visibility scope for list queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeadScope {
    /// Every lead (admin).
    All,
    /// Leads currently offered to a candidate pool (admin broadcast list).
    Broadcasted,
    /// Creator or assignee (channel partner).
    VisibleToChannelPartner(Uuid),
    /// Creator, assignee, or decliner, excluding leads still broadcast
    /// unless this agent accepted them.
    VisibleToAgent(Uuid),
    /// Leads settled on a specific agent (admin drill-down).
    AssignedAgent(Uuid),
    /// Broadcast leads this agent won (dashboard count).
    AcceptedBroadcastBy(Uuid),
    /// Leads carrying at least one follow-up authored by this actor.
    FollowUpAuthor(Uuid),
}

/// A composed list query: visibility scope plus the optional status filter,
/// free-text search, and pagination window shared by every listing endpoint.
#[derive(Debug, Clone)]
pub struct LeadQuery {
    pub scope: LeadScope,
    pub status: Option<String>,
    pub q: Option<String>,
    pub page: Option<Page>,
}

impl LeadQuery {
    pub fn scoped(scope: LeadScope) -> Self {
        Self {
            scope,
            status: None,
            q: None,
            page: None,
        }
    }

    pub fn with_status(mut self, status: Option<String>) -> Self {
        self.status = status.map(|s| s.to_lowercase());
        self
    }

    pub fn with_search(mut self, q: Option<String>) -> Self {
        self.q = q.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn with_page(mut self, page: Page) -> Self {
        self.page = Some(page);
        self
    }

    /// Reference predicate for the query. The in-memory store filters with
    /// this directly; the Postgres implementation compiles the same
    /// conditions to SQL and must stay behaviorally equivalent.
    pub fn matches(&self, lead: &Lead) -> bool {
        self.scope_matches(lead)
            && self
                .status
                .as_ref()
                .is_none_or(|status| lead.status.eq_ignore_ascii_case(status))
            && self.q.as_ref().is_none_or(|q| search_matches(lead, q))
    }

    fn scope_matches(&self, lead: &Lead) -> bool {
        match &self.scope {
            LeadScope::All => true,
            LeadScope::Broadcasted => lead.is_broadcasted,
            LeadScope::VisibleToChannelPartner(id) => {
                lead.created_by_id == *id || lead.assigned_to == Some(*id)
            }
            LeadScope::VisibleToAgent(id) => {
                let involved = lead.created_by_id == *id
                    || lead.assigned_to == Some(*id)
                    || lead.declined_by.contains(id);
                let visible = !lead.is_broadcasted || lead.accepted_by == Some(*id);
                involved && visible
            }
            LeadScope::AssignedAgent(id) => {
                lead.assigned_to == Some(*id)
                    && lead.assigned_to_kind == Some(crate::models::AssigneeKind::Agent)
            }
            LeadScope::AcceptedBroadcastBy(id) => {
                !lead.is_broadcasted && lead.accepted_by == Some(*id)
            }
            LeadScope::FollowUpAuthor(id) => {
                lead.follow_ups.iter().any(|f| f.added_by.id == *id)
            }
        }
    }
}

/// Case-insensitive substring match across the searchable contact and
/// assignment fields.
fn search_matches(lead: &Lead, q: &str) -> bool {
    let needle = q.to_lowercase();
    let mut haystacks: Vec<String> = vec![
        lead.name.clone(),
        lead.email.clone(),
        lead.phone_number.clone(),
        lead.interest.search_text(),
        lead.source.clone(),
        lead.status.clone(),
    ];
    for field in [
        &lead.address,
        &lead.property_type,
        &lead.requirement_type,
        &lead.budget,
        &lead.remark,
        &lead.assigned_to_name,
    ] {
        if let Some(value) = field {
            haystacks.push(value.clone());
        }
    }
    haystacks.push(lead.created_by_name.clone());
    haystacks
        .iter()
        .any(|h| h.to_lowercase().contains(&needle))
}

/// Durable record of leads. The lifecycle engine is the sole writer.
#[async_trait]
pub trait LeadStore: Send + Sync {
    async fn insert(&self, lead: Lead) -> Result<Lead>;

    /// Persist the full current state of a lead (single-document update
    /// semantics; concurrent saves are last-write-wins).
    async fn save(&self, lead: &Lead) -> Result<Lead>;

    async fn find_by_id(&self, lead_id: Uuid) -> Result<Option<Lead>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Lead>>;

    /// Leads matching the query, newest first.
    async fn list(&self, query: &LeadQuery) -> Result<Vec<Lead>>;

    async fn count(&self, query: &LeadQuery) -> Result<u64>;

    /// Atomic conditional acceptance: settles the lead on `agent` only if it
    /// is still broadcast and unaccepted, in one guarded write.
    async fn try_accept(&self, lead_id: Uuid, agent: &Assignee) -> Result<AcceptOutcome>;

    /// Idempotent decline: adds the agent to `declined_by` (at most once)
    /// and removes them from the candidate set, in one write.
    async fn append_decline(&self, lead_id: Uuid, agent_id: Uuid) -> Result<Lead>;
}

/// Read-only lookup of eligible assignees.
#[async_trait]
pub trait AssigneeDirectory: Send + Sync {
    /// All currently-active, non-deleted agents.
    async fn find_active_agents(&self) -> Result<Vec<Assignee>>;

    /// Dual lookup: the id is tried against agents first, then channel
    /// partners; deleted or inactive records never resolve.
    async fn find_assignable(&self, id: Uuid) -> Result<Option<Assignee>>;
}

/// Read-only view of the admin-curated status catalog, filtered to live
/// entries.
#[async_trait]
pub trait StatusCatalog: Send + Sync {
    async fn find_active(&self, id: Uuid) -> Result<Option<StatusEntry>>;

    async fn list_active(&self) -> Result<Vec<StatusEntry>>;
}

/// Resolver for project references inside `interested_in`.
#[async_trait]
pub trait ProjectDirectory: Send + Sync {
    async fn exists(&self, id: Uuid) -> Result<bool>;

    async fn title(&self, id: Uuid) -> Result<Option<String>>;
}
