//! # In-Memory Store
//!
//! Single-process implementations of the store contracts, backed by
//! `parking_lot` locks. Used by the test suite and for embedded/demo runs
//! without a database.
//!
//! The acceptance guard runs entirely inside one write lock, giving the same
//! first-writer-wins semantics the Postgres implementation gets from its
//! conditional `UPDATE`.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use super::{AcceptOutcome, AssigneeDirectory, LeadQuery, LeadStore, ProjectDirectory, StatusCatalog};
use crate::error::{LeadError, Result};
use crate::models::{Assignee, Lead, StatusEntry};

/// Lead store over a locked map.
#[derive(Default)]
pub struct InMemoryLeadStore {
    leads: RwLock<HashMap<Uuid, Lead>>,
}

impl InMemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LeadStore for InMemoryLeadStore {
    async fn insert(&self, lead: Lead) -> Result<Lead> {
        let mut leads = self.leads.write();
        if leads
            .values()
            .any(|existing| existing.email.eq_ignore_ascii_case(&lead.email))
        {
            return Err(LeadError::conflict("A lead with this email already exists."));
        }
        leads.insert(lead.lead_id, lead.clone());
        Ok(lead)
    }

    async fn save(&self, lead: &Lead) -> Result<Lead> {
        let mut leads = self.leads.write();
        if !leads.contains_key(&lead.lead_id) {
            return Err(LeadError::not_found("Lead not found"));
        }
        leads.insert(lead.lead_id, lead.clone());
        Ok(lead.clone())
    }

    async fn find_by_id(&self, lead_id: Uuid) -> Result<Option<Lead>> {
        Ok(self.leads.read().get(&lead_id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Lead>> {
        Ok(self
            .leads
            .read()
            .values()
            .find(|lead| lead.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list(&self, query: &LeadQuery) -> Result<Vec<Lead>> {
        let mut matched: Vec<Lead> = self
            .leads
            .read()
            .values()
            .filter(|lead| query.matches(lead))
            .cloned()
            .collect();
        matched.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.lead_id.cmp(&b.lead_id))
        });
        if let Some(page) = query.page {
            let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
            matched = matched
                .into_iter()
                .skip(offset)
                .take(page.per_page as usize)
                .collect();
        }
        Ok(matched)
    }

    async fn count(&self, query: &LeadQuery) -> Result<u64> {
        Ok(self
            .leads
            .read()
            .values()
            .filter(|lead| query.matches(lead))
            .count() as u64)
    }

    async fn try_accept(&self, lead_id: Uuid, agent: &Assignee) -> Result<AcceptOutcome> {
        let mut leads = self.leads.write();
        let lead = leads
            .get_mut(&lead_id)
            .ok_or_else(|| LeadError::not_found("Lead not found"))?;

        if lead.is_broadcasted && lead.accepted_by.is_none() {
            lead.settle_acceptance(agent, Utc::now());
            Ok(AcceptOutcome::Accepted(lead.clone()))
        } else {
            Ok(AcceptOutcome::AlreadyTaken(lead.clone()))
        }
    }

    async fn append_decline(&self, lead_id: Uuid, agent_id: Uuid) -> Result<Lead> {
        let mut leads = self.leads.write();
        let lead = leads
            .get_mut(&lead_id)
            .ok_or_else(|| LeadError::not_found("Lead not found"))?;
        lead.record_decline(agent_id);
        Ok(lead.clone())
    }
}

/// Directory entry with the activity flags the lookups filter on.
#[derive(Debug, Clone)]
struct DirectoryRecord {
    assignee: Assignee,
    active: bool,
    deleted: bool,
}

/// Assignee directory over two locked maps, mirroring the agent and
/// channel-partner collections the dual lookup tries in order.
#[derive(Default)]
pub struct InMemoryDirectory {
    agents: RwLock<HashMap<Uuid, DirectoryRecord>>,
    partners: RwLock<HashMap<Uuid, DirectoryRecord>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_agent(&self, id: Uuid, name: impl Into<String>) {
        self.agents.write().insert(
            id,
            DirectoryRecord {
                assignee: Assignee::agent(id, name),
                active: true,
                deleted: false,
            },
        );
    }

    pub fn add_partner(&self, id: Uuid, name: impl Into<String>) {
        self.partners.write().insert(
            id,
            DirectoryRecord {
                assignee: Assignee::channel_partner(id, name),
                active: true,
                deleted: false,
            },
        );
    }

    pub fn deactivate_agent(&self, id: Uuid) {
        if let Some(record) = self.agents.write().get_mut(&id) {
            record.active = false;
        }
    }

    pub fn delete_agent(&self, id: Uuid) {
        if let Some(record) = self.agents.write().get_mut(&id) {
            record.deleted = true;
        }
    }
}

#[async_trait]
impl AssigneeDirectory for InMemoryDirectory {
    async fn find_active_agents(&self) -> Result<Vec<Assignee>> {
        let mut agents: Vec<Assignee> = self
            .agents
            .read()
            .values()
            .filter(|record| record.active && !record.deleted)
            .map(|record| record.assignee.clone())
            .collect();
        agents.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(agents)
    }

    async fn find_assignable(&self, id: Uuid) -> Result<Option<Assignee>> {
        let live = |record: &DirectoryRecord| record.active && !record.deleted;
        if let Some(record) = self.agents.read().get(&id).filter(|r| live(r)) {
            return Ok(Some(record.assignee.clone()));
        }
        Ok(self
            .partners
            .read()
            .get(&id)
            .filter(|r| live(r))
            .map(|record| record.assignee.clone()))
    }
}

/// Status catalog over a locked map with soft-delete flags.
#[derive(Default)]
pub struct InMemoryStatusCatalog {
    entries: RwLock<HashMap<Uuid, (StatusEntry, bool)>>,
}

impl InMemoryStatusCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, entry: StatusEntry) {
        self.entries.write().insert(entry.id, (entry, false));
    }

    pub fn soft_delete(&self, id: Uuid) {
        if let Some((_, deleted)) = self.entries.write().get_mut(&id) {
            *deleted = true;
        }
    }
}

#[async_trait]
impl StatusCatalog for InMemoryStatusCatalog {
    async fn find_active(&self, id: Uuid) -> Result<Option<StatusEntry>> {
        Ok(self
            .entries
            .read()
            .get(&id)
            .filter(|(_, deleted)| !deleted)
            .map(|(entry, _)| entry.clone()))
    }

    async fn list_active(&self) -> Result<Vec<StatusEntry>> {
        let mut entries: Vec<StatusEntry> = self
            .entries
            .read()
            .values()
            .filter(|(_, deleted)| !deleted)
            .map(|(entry, _)| entry.clone())
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

/// Project directory over a locked map of titles.
#[derive(Default)]
pub struct InMemoryProjectDirectory {
    titles: RwLock<HashMap<Uuid, String>>,
}

impl InMemoryProjectDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, id: Uuid, title: impl Into<String>) {
        self.titles.write().insert(id, title.into());
    }
}

#[async_trait]
impl ProjectDirectory for InMemoryProjectDirectory {
    async fn exists(&self, id: Uuid) -> Result<bool> {
        Ok(self.titles.read().contains_key(&id))
    }

    async fn title(&self, id: Uuid) -> Result<Option<String>> {
        Ok(self.titles.read().get(&id).cloned())
    }
}
