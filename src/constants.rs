//! # System Constants
//!
//! Event names, sentinels, and operational boundaries shared across the
//! lifecycle engine, the notification fan-out, and the web surface.

/// Lifecycle events published to the notification transport.
pub mod events {
    /// A lead was assigned directly to an actor.
    pub const LEAD_ASSIGNED: &str = "lead.assigned";
    /// A lead was offered to a pool of candidate agents.
    pub const LEAD_BROADCASTED: &str = "lead.broadcasted";
    /// A broadcast lead was taken by another candidate.
    pub const LEAD_TAKEN: &str = "lead.taken";
    /// A candidate accepted a broadcast lead.
    pub const LEAD_ACCEPTED: &str = "lead.accepted";
    /// A candidate opted out of a broadcast lead.
    pub const LEAD_DECLINED: &str = "lead.declined";
    /// A lead moved to a different pipeline status.
    pub const LEAD_STATUS_CHANGED: &str = "lead.status_changed";
}

/// Status every new lead starts in. Mirrors the catalog entry of the same
/// name; the catalog is seeded with it.
pub const INITIAL_STATUS: &str = "new";

/// Sentinel `assigned_to` value that triggers a broadcast to all active
/// agents instead of a direct assignment.
pub const BROADCAST_ALL: &str = "all";

/// Shared notification channel joined by every admin session.
pub const ADMIN_CHANNEL: &str = "admins";

/// Minimum length for a free-text `interested_in` descriptor.
pub const MIN_INTEREST_TEXT_LEN: usize = 3;

/// Bounds for phone numbers accepted at intake.
pub const PHONE_MIN_LEN: usize = 10;
pub const PHONE_MAX_LEN: usize = 15;

/// Intake dates arrive as DD/MM/YYYY strings from the mobile forms.
pub const INTAKE_DATE_FORMAT: &str = "%d/%m/%Y";

/// Default page size for the admin broadcast listing.
pub const DEFAULT_PAGE_SIZE: u32 = 20;
