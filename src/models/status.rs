//! # Status Catalog Entry
//!
//! Pipeline stages are admin-curated in an external catalog; the engine reads
//! live entries to validate transitions and to build per-actor breakdowns.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A live (non-deleted) pipeline status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub id: Uuid,
    pub name: String,
}

impl StatusEntry {
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Canonical lowercase form denormalized onto leads for filtering.
    pub fn canonical_name(&self) -> String {
        self.name.to_lowercase()
    }
}
