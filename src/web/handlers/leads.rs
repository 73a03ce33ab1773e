//! # Lead Handlers
//!
//! HTTP endpoints for the lead lifecycle: creation, role-scoped listings,
//! the combined update on its role-partitioned routes, the broadcast
//! accept/decline shortcuts, and follow-ups. Each handler extracts the
//! acting identity, delegates to the engine, and wraps the result.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::constants::DEFAULT_PAGE_SIZE;
use crate::error::LeadError;
use crate::lifecycle::{FollowUpInput, ListFilter};
use crate::models::{ActorRole, LeadDraft, LeadUpdate};
use crate::store::Page;
use crate::web::auth::CurrentActor;
use crate::web::errors::ApiResult;
use crate::web::responses::respond;
use crate::web::state::AppState;

fn parse_lead_id(raw: &str) -> Result<Uuid, LeadError> {
    Uuid::parse_str(raw).map_err(|_| LeadError::validation("Invalid lead ID"))
}

pub async fn create_lead(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(draft): Json<LeadDraft>,
) -> ApiResult<Response> {
    let view = state.engine.create(&actor, draft).await?;
    Ok(respond(
        StatusCode::CREATED,
        "Lead created successfully",
        json!({ "lead": view }),
    ))
}

pub async fn get_lead(
    State(state): State<AppState>,
    CurrentActor(_actor): CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let lead_id = parse_lead_id(&id)?;
    let view = state.engine.get(lead_id).await?;
    Ok(respond(
        StatusCode::OK,
        "Lead fetched successfully",
        json!({ "lead": view }),
    ))
}

pub async fn list_for_admin(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(filter): Query<ListFilter>,
) -> ApiResult<Response> {
    let listing = state.engine.list_for_admin(&actor, &filter).await?;
    Ok(respond(StatusCode::OK, "Leads fetched successfully", listing))
}

pub async fn list_for_agent(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(filter): Query<ListFilter>,
) -> ApiResult<Response> {
    let listing = state.engine.list_for_agent(&actor, &filter).await?;
    Ok(respond(StatusCode::OK, "Leads fetched successfully", listing))
}

pub async fn list_for_channel_partner(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(filter): Query<ListFilter>,
) -> ApiResult<Response> {
    let listing = state.engine.list_for_channel_partner(&actor, &filter).await?;
    Ok(respond(StatusCode::OK, "Leads fetched successfully", listing))
}

#[derive(Debug, Deserialize)]
pub struct BroadcastPageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

pub async fn list_broadcasted(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<BroadcastPageQuery>,
) -> ApiResult<Response> {
    let page = Page::new(
        query.page.unwrap_or(1),
        query.per_page.unwrap_or(DEFAULT_PAGE_SIZE),
    );
    let listing = state.engine.list_broadcasted(&actor, page).await?;
    Ok(respond(
        StatusCode::OK,
        "Broadcasted leads fetched successfully",
        listing,
    ))
}

/// Admin drill-down: leads currently settled on one agent.
pub async fn list_for_assigned_agent(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(agent_id): Path<String>,
) -> ApiResult<Response> {
    let agent_id =
        Uuid::parse_str(&agent_id).map_err(|_| LeadError::validation("Invalid agent ID"))?;
    let listing = state.engine.list_for_assigned_agent(&actor, agent_id).await?;
    Ok(respond(
        StatusCode::OK,
        "Leads for agent fetched successfully",
        listing,
    ))
}

async fn update_on_channel(
    state: AppState,
    actor: crate::models::Actor,
    channel_role: ActorRole,
    id: String,
    update: LeadUpdate,
) -> ApiResult<Response> {
    let lead_id = parse_lead_id(&id)?;
    let view = state.engine.update(&actor, channel_role, lead_id, update).await?;
    Ok(respond(
        StatusCode::OK,
        "Lead updated successfully",
        json!({ "lead": view }),
    ))
}

pub async fn update_by_admin(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    Json(update): Json<LeadUpdate>,
) -> ApiResult<Response> {
    update_on_channel(state, actor, ActorRole::Admin, id, update).await
}

pub async fn update_by_agent(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    Json(update): Json<LeadUpdate>,
) -> ApiResult<Response> {
    update_on_channel(state, actor, ActorRole::Agent, id, update).await
}

pub async fn update_by_channel_partner(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    Json(update): Json<LeadUpdate>,
) -> ApiResult<Response> {
    update_on_channel(state, actor, ActorRole::ChannelPartner, id, update).await
}

pub async fn accept_lead(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let lead_id = parse_lead_id(&id)?;
    let view = state.engine.accept(&actor, lead_id).await?;
    Ok(respond(
        StatusCode::OK,
        "Lead accepted successfully",
        json!({ "lead": view }),
    ))
}

pub async fn decline_lead(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let lead_id = parse_lead_id(&id)?;
    let view = state.engine.decline(&actor, lead_id).await?;
    Ok(respond(
        StatusCode::OK,
        "Lead declined successfully",
        json!({ "lead": view }),
    ))
}

pub async fn add_follow_up(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    Json(input): Json<FollowUpInput>,
) -> ApiResult<Response> {
    let lead_id = parse_lead_id(&id)?;
    let follow_up = state.engine.add_follow_up(&actor, lead_id, input).await?;
    Ok(respond(
        StatusCode::CREATED,
        "Follow-up added successfully",
        json!({ "follow_up": follow_up }),
    ))
}

pub async fn my_follow_ups(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> ApiResult<Response> {
    let results = state.engine.my_follow_ups(&actor).await?;
    Ok(respond(
        StatusCode::OK,
        "Follow-ups fetched successfully",
        json!({ "results": results }),
    ))
}
