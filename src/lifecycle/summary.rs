//! # Status Breakdown
//!
//! Per-listing dashboard summary: one count per live catalog status plus the
//! total. Always derived fresh from the filtered result set, never stored.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::{Lead, StatusEntry};

/// Count of leads per catalog status for one filtered listing. Catalog
/// entries with no matching leads report zero; lead statuses that no longer
/// exist in the catalog are not reported (the catalog drives the dashboard
/// rows).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusBreakdown {
    #[serde(flatten)]
    pub counts: BTreeMap<String, u64>,
    pub total_items: u64,
}

impl StatusBreakdown {
    pub fn compute(leads: &[Lead], catalog: &[StatusEntry]) -> Self {
        let mut counts: BTreeMap<String, u64> = catalog
            .iter()
            .map(|entry| (entry.canonical_name(), 0))
            .collect();

        for lead in leads {
            if let Some(count) = counts.get_mut(&lead.status.to_lowercase()) {
                *count += 1;
            }
        }

        Self {
            counts,
            total_items: leads.len() as u64,
        }
    }

    pub fn count_for(&self, status: &str) -> u64 {
        self.counts.get(&status.to_lowercase()).copied().unwrap_or(0)
    }
}
