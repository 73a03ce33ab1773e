//! # Web Application State
//!
//! Shared state for the web API: the lifecycle engine, which carries its
//! own store, directory, catalog, and notifier handles.

use crate::lifecycle::LeadLifecycle;

#[derive(Clone)]
pub struct AppState {
    pub engine: LeadLifecycle,
}

impl AppState {
    pub fn new(engine: LeadLifecycle) -> Self {
        Self { engine }
    }
}
