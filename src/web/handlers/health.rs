//! Liveness probe.

use axum::http::StatusCode;
use axum::response::Response;
use serde_json::json;

use crate::web::responses::respond;

pub async fn health() -> Response {
    respond(StatusCode::OK, "ok", json!({ "service": "leadflow-core" }))
}
