//! Shared fixtures: a lifecycle engine wired to the in-memory store with a
//! seeded status catalog and assignee directory.

// Each test binary compiles its own copy; not all of them use every helper.
#![allow(dead_code)]

use std::sync::Arc;

use uuid::Uuid;

use leadflow_core::lifecycle::LeadLifecycle;
use leadflow_core::models::{Actor, ActorRole, LeadDraft, StatusEntry};
use leadflow_core::notify::Notifier;
use leadflow_core::store::memory::{
    InMemoryDirectory, InMemoryLeadStore, InMemoryProjectDirectory, InMemoryStatusCatalog,
};

pub struct Harness {
    pub engine: LeadLifecycle,
    pub store: Arc<InMemoryLeadStore>,
    pub directory: Arc<InMemoryDirectory>,
    pub catalog: Arc<InMemoryStatusCatalog>,
    pub projects: Arc<InMemoryProjectDirectory>,
    pub status_new: StatusEntry,
    pub status_contacted: StatusEntry,
    pub status_closed: StatusEntry,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryLeadStore::new());
        let directory = Arc::new(InMemoryDirectory::new());
        let catalog = Arc::new(InMemoryStatusCatalog::new());
        let projects = Arc::new(InMemoryProjectDirectory::new());

        let status_new = StatusEntry::new(Uuid::new_v4(), "New");
        let status_contacted = StatusEntry::new(Uuid::new_v4(), "Contacted");
        let status_closed = StatusEntry::new(Uuid::new_v4(), "Closed");
        catalog.add(status_new.clone());
        catalog.add(status_contacted.clone());
        catalog.add(status_closed.clone());

        let engine = LeadLifecycle::new(
            store.clone(),
            directory.clone(),
            catalog.clone(),
            projects.clone(),
            Notifier::new(256),
        );

        Self {
            engine,
            store,
            directory,
            catalog,
            projects,
            status_new,
            status_contacted,
            status_closed,
        }
    }

    pub fn admin(&self) -> Actor {
        Actor::new(Uuid::new_v4(), "Asha Admin", ActorRole::Admin)
    }

    /// Register an active agent in the directory and return it as an actor.
    pub fn seed_agent(&self, name: &str) -> Actor {
        let id = Uuid::new_v4();
        self.directory.add_agent(id, name);
        Actor::new(id, name, ActorRole::Agent)
    }

    /// Register an active channel partner and return it as an actor.
    pub fn seed_partner(&self, name: &str) -> Actor {
        let id = Uuid::new_v4();
        self.directory.add_partner(id, name);
        Actor::new(id, name, ActorRole::ChannelPartner)
    }
}

/// Minimal draft passing the admin quick form.
pub fn draft(email: &str) -> LeadDraft {
    LeadDraft {
        name: "Ravi Kumar".to_string(),
        email: email.to_string(),
        phone_number: "9876543210".to_string(),
        interested_in: "Lakeside Towers phase 2".to_string(),
        source: "website".to_string(),
        date: "05/08/2026".to_string(),
        ..LeadDraft::default()
    }
}

/// Draft carrying the qualification fields agent and partner intake require.
pub fn qualified_draft(email: &str) -> LeadDraft {
    LeadDraft {
        address: Some("Baner, Pune".to_string()),
        property_type: Some("apartment".to_string()),
        requirement_type: Some("buy".to_string()),
        budget: Some("80L".to_string()),
        remark: Some("prefers east facing".to_string()),
        ..draft(email)
    }
}
