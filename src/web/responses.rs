//! # Response Envelope
//!
//! Every endpoint answers with the same JSON envelope: `success`/`error`
//! flags, a human-readable message, and the payload fields flattened
//! alongside them.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiEnvelope<T: Serialize> {
    pub success: bool,
    pub error: bool,
    pub message: String,
    #[serde(flatten)]
    pub data: T,
}

/// Wrap a payload in the envelope under the given status code.
pub fn respond<T: Serialize>(status: StatusCode, message: impl Into<String>, data: T) -> Response {
    let success = status.is_success();
    let envelope = ApiEnvelope {
        success,
        error: !success,
        message: message.into(),
        data,
    };
    (status, Json(envelope)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_flattens_payload() {
        let envelope = ApiEnvelope {
            success: true,
            error: false,
            message: "ok".to_string(),
            data: json!({"results": [1, 2, 3]}),
        };
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["error"], false);
        assert_eq!(value["results"], json!([1, 2, 3]));
    }
}
