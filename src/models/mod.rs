pub mod actor;
pub mod lead;
pub mod status;

// Re-export core models for easy access
pub use actor::{Actor, ActorRole, Assignee, AssigneeKind};
pub use lead::{
    BroadcastAction, FollowUp, FollowUpAuthor, Interest, Lead, LeadDraft, LeadUpdate, LeadView,
    SourceType, StatusHistoryEntry,
};
pub use status::StatusEntry;
