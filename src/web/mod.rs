//! # Web API
//!
//! Role-partitioned HTTP surface over the lifecycle engine. Handlers stay
//! thin: extract the acting identity, hand off to the engine, wrap the
//! result in the JSON envelope. Authentication itself happens upstream; the
//! gateway forwards the verified actor identity as request headers.

pub mod auth;
pub mod errors;
pub mod handlers;
pub mod responses;
pub mod state;

use axum::routing::{get, patch, post};
use axum::Router;

use handlers::{health, leads};
use state::AppState;

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/leads", post(leads::create_lead))
        .route("/leads/admin", get(leads::list_for_admin))
        .route("/leads/agent", get(leads::list_for_agent))
        .route("/leads/channel-partner", get(leads::list_for_channel_partner))
        .route("/leads/broadcasted", get(leads::list_broadcasted))
        .route(
            "/leads/:id",
            get(leads::get_lead).patch(leads::update_by_agent),
        )
        .route(
            "/leads/admin/:id",
            patch(leads::update_by_admin).get(leads::list_for_assigned_agent),
        )
        .route("/leads/agent/:id", patch(leads::update_by_agent))
        .route("/leads/channel-partner/:id", patch(leads::update_by_channel_partner))
        .route("/leads/accept/:id", post(leads::accept_lead))
        .route("/leads/decline/:id", post(leads::decline_lead))
        .route("/leads/:id/follow-ups", post(leads::add_follow_up))
        .route("/follow-ups/mine", get(leads::my_follow_ups))
        .with_state(state)
}
