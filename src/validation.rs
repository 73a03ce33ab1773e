//! # Input Validation
//!
//! Field-level validation for intake and update payloads, mirroring the
//! role-dependent intake forms: the admin quick form carries contact basics
//! only, while agent and channel-partner intake also requires the property
//! qualification fields. Messages are caller-safe and name the offending
//! field.

use chrono::NaiveDate;

use crate::constants::{INTAKE_DATE_FORMAT, PHONE_MAX_LEN, PHONE_MIN_LEN};
use crate::error::{LeadError, Result};
use crate::models::{ActorRole, LeadDraft, LeadUpdate};

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(LeadError::validation(format!("{field} is required")));
    }
    Ok(())
}

fn require_opt(field: &str, value: Option<&String>) -> Result<()> {
    match value {
        Some(value) => require(field, value),
        None => Err(LeadError::validation(format!("{field} is required"))),
    }
}

/// Light structural email check; full deliverability verification belongs to
/// the intake channel.
fn check_email(email: &str) -> Result<()> {
    require("email", email)?;
    let mut parts = email.split('@');
    let (local, domain) = (parts.next().unwrap_or(""), parts.next().unwrap_or(""));
    let well_formed = parts.next().is_none()
        && !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.');
    if !well_formed {
        return Err(LeadError::validation("email must be a valid email address"));
    }
    Ok(())
}

fn check_phone(phone: &str) -> Result<()> {
    require("phone_number", phone)?;
    let len = phone.trim().len();
    if len < PHONE_MIN_LEN || len > PHONE_MAX_LEN {
        return Err(LeadError::validation(format!(
            "phone_number must be between {PHONE_MIN_LEN} and {PHONE_MAX_LEN} characters"
        )));
    }
    Ok(())
}

/// Intake dates come from the mobile forms as DD/MM/YYYY.
pub fn check_intake_date(date: &str) -> Result<()> {
    require("date", date)?;
    NaiveDate::parse_from_str(date.trim(), INTAKE_DATE_FORMAT)
        .map_err(|_| LeadError::validation("date must be in DD/MM/YYYY format"))?;
    Ok(())
}

/// Validate a create payload against the intake form of the creator's role.
pub fn validate_lead_draft(role: ActorRole, draft: &LeadDraft) -> Result<()> {
    require("name", &draft.name)?;
    check_email(&draft.email)?;
    check_phone(&draft.phone_number)?;
    require("interested_in", &draft.interested_in)?;
    require("source", &draft.source)?;
    check_intake_date(&draft.date)?;

    match role {
        ActorRole::Admin => {}
        ActorRole::Agent | ActorRole::ChannelPartner => {
            require_opt("address", draft.address.as_ref())?;
            require_opt("property_type", draft.property_type.as_ref())?;
            require_opt("requirement_type", draft.requirement_type.as_ref())?;
            require_opt("budget", draft.budget.as_ref())?;
            require_opt("remark", draft.remark.as_ref())?;
        }
    }

    if role == ActorRole::ChannelPartner {
        require_opt("assigned_to", draft.assigned_to.as_ref())?;
    }

    Ok(())
}

/// An update must carry at least one of the three sub-transition fields.
pub fn validate_lead_update(update: &LeadUpdate) -> Result<()> {
    if update.status.is_none() && update.assigned_to.is_none() && update.action.is_none() {
        return Err(LeadError::validation(
            "Invalid request body: at least one of status, assigned_to, or action is required",
        ));
    }
    if let Some(status) = &update.status {
        require("status", status)?;
    }
    if let Some(assigned_to) = &update.assigned_to {
        require("assigned_to", assigned_to)?;
    }
    Ok(())
}
