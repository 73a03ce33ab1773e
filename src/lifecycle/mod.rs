// Lead lifecycle engine
//
// Owns every lead transition (create, assign, broadcast, accept, decline,
// status change) and the role-scoped read side. The engine is the sole
// writer of lead state; authorization and validation run before any
// mutation, and notification fan-out runs after, never affecting the
// outcome of the transition itself.

pub mod engine;
pub mod roles;
pub mod summary;

// Re-export main types for convenient access
pub use engine::{
    AgentLeadListing, BroadcastPage, FollowUpInput, FollowUpSummary, LeadLifecycle, LeadListing,
    ListFilter, PartnerLeadListing,
};
pub use roles::{policy_for, RolePolicy};
pub use summary::StatusBreakdown;
