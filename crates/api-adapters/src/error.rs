//! Response envelope and the mapping of domain failures to HTTP statuses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use domains::DomainError;
use serde::Serialize;
use tracing::error;

/// `{ "success": true, "data": ... }`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

/// `{ "success": false, "msg": ... }`
#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    msg: String,
}

#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
            DomainError::Validation(_) => StatusCode::BAD_REQUEST,
            DomainError::AccessDenied(_) => StatusCode::FORBIDDEN,
            DomainError::CacheDisabled => StatusCode::BAD_REQUEST,
            DomainError::Conflict(_) => StatusCode::CONFLICT,
            DomainError::Store(_) | DomainError::Enrichment(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Storage details stay in the logs.
        let msg = if status.is_server_error() {
            error!(err = %self.0, "request failed");
            "internal server error".to_string()
        } else {
            self.0.to_string()
        };
        let body = ErrorBody {
            success: false,
            msg,
        };
        (status, Json(body)).into_response()
    }
}
