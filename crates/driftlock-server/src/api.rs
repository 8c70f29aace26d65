//! HTTP error mapping for controller operations.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use driftlock_controller::ControllerError;
use serde_json::json;

/// An API-facing error: status code plus a JSON `{"error": ...}` body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({"error": self.message}))).into_response()
    }
}

impl From<ControllerError> for ApiError {
    fn from(err: ControllerError) -> Self {
        let status = match &err {
            ControllerError::UnknownApplication { .. } => StatusCode::NOT_FOUND,
            ControllerError::AlreadyExists { .. } => StatusCode::CONFLICT,
            ControllerError::Core(_) => StatusCode::BAD_REQUEST,
            ControllerError::Source(_) | ControllerError::Target(_) => StatusCode::BAD_GATEWAY,
            ControllerError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let err: ApiError = ControllerError::unknown_application("ghost").into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let err: ApiError = ControllerError::already_exists("shop").into();
        assert_eq!(err.status, StatusCode::CONFLICT);

        let err: ApiError =
            ControllerError::Core(driftlock_core::CoreError::invalid_application_name("Bad"))
                .into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
