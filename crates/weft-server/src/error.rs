//! HTTP edge error mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use weft_core::WeftError;

/// An error ready to leave the process: status plus a compact JSON body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<WeftError> for ApiError {
    fn from(err: WeftError) -> Self {
        let status = match &err {
            WeftError::Protocol(_) | WeftError::Verification(_) | WeftError::Serialization(_) => {
                StatusCode::BAD_REQUEST
            }
            WeftError::Auth(_) => StatusCode::UNAUTHORIZED,
            WeftError::Forbidden(_) => StatusCode::FORBIDDEN,
            WeftError::NotFound(_) => StatusCode::NOT_FOUND,
            WeftError::Conflict(_) => StatusCode::CONFLICT,
            WeftError::Precondition(_) => StatusCode::PRECONDITION_FAILED,
            WeftError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            WeftError::Dependency(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self { status, message: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_statuses() {
        let cases = [
            (WeftError::Protocol("x".into()), StatusCode::BAD_REQUEST),
            (WeftError::Auth("x".into()), StatusCode::UNAUTHORIZED),
            (WeftError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (WeftError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (WeftError::Conflict("x".into()), StatusCode::CONFLICT),
            (WeftError::Precondition("x".into()), StatusCode::PRECONDITION_FAILED),
            (WeftError::TooLarge { size: 2, limit: 1 }, StatusCode::PAYLOAD_TOO_LARGE),
            (WeftError::Dependency("x".into()), StatusCode::SERVICE_UNAVAILABLE),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }
}
