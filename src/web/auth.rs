//! # Actor Identity Extraction
//!
//! Token verification happens at the upstream gateway; by the time a request
//! reaches this service the verified identity travels in three headers. The
//! extractor rebuilds the [`Actor`] from them and rejects anything
//! incomplete or malformed before a handler runs.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use super::errors::ApiError;
use crate::models::{Actor, ActorRole};

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";
pub const ACTOR_NAME_HEADER: &str = "x-actor-name";

/// The authenticated caller, extracted from gateway headers.
#[derive(Debug, Clone)]
pub struct CurrentActor(pub Actor);

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, ApiError> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::Unauthorized(format!("Authentication required: missing {name}")))
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header(parts, ACTOR_ID_HEADER)?;
        let role = header(parts, ACTOR_ROLE_HEADER)?;
        let name = header(parts, ACTOR_NAME_HEADER)?;

        let id = Uuid::parse_str(id)
            .map_err(|_| ApiError::Unauthorized("Invalid actor identity".to_string()))?;
        let role: ActorRole = role
            .parse()
            .map_err(|_| ApiError::Unauthorized("Invalid actor role".to_string()))?;

        Ok(CurrentActor(Actor::new(id, name, role)))
    }
}
