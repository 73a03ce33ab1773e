//! # Error Taxonomy
//!
//! Domain errors for lead lifecycle operations, partitioned by how the
//! surrounding API surfaces them: validation (400), not-found (404),
//! authorization (403), conflict (409), internal (500).
//!
//! Authorization denials carry a generic message only; they must not leak
//! other actors' assignment details. Internal errors are logged with full
//! context at the failure site and surfaced to callers as a generic message.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LeadError {
    /// Malformed or missing input. The message is field-level and safe to
    /// return to the caller verbatim.
    #[error("{0}")]
    Validation(String),

    /// A referenced lead, status, or actor id did not resolve.
    #[error("{0}")]
    NotFound(String),

    /// Role or ownership gate failed.
    #[error("{0}")]
    Authorization(String),

    /// Duplicate email on create, or an acceptance that lost the race.
    #[error("{0}")]
    Conflict(String),

    /// Unexpected persistence or transport failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LeadError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn authorization(msg: impl Into<String>) -> Self {
        Self::Authorization(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Postgres unique-violation code, used to fold duplicate-email races that
/// slip past the pre-insert check into the conflict variant.
const PG_UNIQUE_VIOLATION: &str = "23505";

impl From<sqlx::Error> for LeadError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.code().as_deref() == Some(PG_UNIQUE_VIOLATION) {
                return LeadError::Conflict("A lead with this email already exists.".to_string());
            }
        }
        LeadError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for LeadError {
    fn from(err: serde_json::Error) -> Self {
        LeadError::Internal(format!("serialization failure: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, LeadError>;
