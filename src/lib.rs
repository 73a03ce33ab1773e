#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Leadflow Core
//!
//! Lead lifecycle and broadcast-assignment engine for the Leadflow
//! real-estate CRM backend.
//!
//! ## Overview
//!
//! Leads are prospective customers moving through an admin-curated status
//! pipeline. Admins, agents, and channel partners create them, reassign
//! them, and move them between statuses; unassigned leads can be broadcast
//! to the whole pool of active agents, where the first acceptance wins. The
//! engine in this crate owns every one of those transitions and is the sole
//! writer of lead state.
//!
//! ## Architecture
//!
//! - [`lifecycle`]: the engine. Create, the combined update (status /
//!   assignment / broadcast accept-decline), the standalone accept and
//!   decline shortcuts, and the role-scoped read side. Role behavior is a
//!   polymorphic policy selected once per operation, not repeated
//!   branching.
//! - [`store`]: behavioral contracts for the lead store, assignee
//!   directory, status catalog, and project resolver, with Postgres and
//!   in-memory implementations. Broadcast acceptance is an atomic
//!   conditional write at this layer; there is no in-process locking
//!   between requests.
//! - [`notify`]: best-effort fan-out of lifecycle events to actors and the
//!   admin channel. Delivery failures never roll back a transition.
//! - [`web`]: role-partitioned axum endpoints with a uniform JSON
//!   envelope.
//! - [`models`]: the lead record, actor/assignee types, and status catalog
//!   entries.
//!
//! ## Concurrency model
//!
//! Request-per-call concurrency. The store is the only shared mutable
//! resource. The one race that matters (many agents accepting the same
//! broadcast lead) is settled by a storage-level compare-and-set on the
//! acceptance field, so the winner is decided identically whether one
//! server instance is running or ten.

pub mod config;
pub mod constants;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod models;
pub mod notify;
pub mod store;
pub mod validation;
pub mod web;

pub use config::LeadflowConfig;
pub use error::{LeadError, Result};
pub use lifecycle::{LeadLifecycle, ListFilter, StatusBreakdown};
pub use models::{
    Actor, ActorRole, Assignee, AssigneeKind, BroadcastAction, Interest, Lead, LeadDraft,
    LeadUpdate, LeadView, StatusEntry,
};
pub use notify::{Notification, Notifier, NotifyTarget};
pub use store::{AcceptOutcome, LeadQuery, LeadScope, Page};
