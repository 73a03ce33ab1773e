//! # Web API Error Types
//!
//! Maps the domain error taxonomy onto HTTP status codes and the JSON
//! envelope. Internal failures are logged here with full context and leave
//! the process as a generic message only.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use super::responses::respond;
use crate::error::LeadError;
use crate::logging::log_error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),

    #[error(transparent)]
    Lead(#[from] LeadError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Lead(err) => match err {
                LeadError::Validation(_) => StatusCode::BAD_REQUEST,
                LeadError::NotFound(_) => StatusCode::NOT_FOUND,
                LeadError::Authorization(_) => StatusCode::FORBIDDEN,
                LeadError::Conflict(_) => StatusCode::CONFLICT,
                LeadError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            // Internal detail is for the logs, not the caller.
            Self::Lead(LeadError::Internal(detail)) => {
                log_error("web", "request", detail, None);
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };
        respond(status, message, json!({}))
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(LeadError::validation("bad")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(LeadError::not_found("missing")).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(LeadError::authorization("nope")).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(LeadError::conflict("dup")).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(LeadError::internal("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::Unauthorized("no identity".into()).status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
