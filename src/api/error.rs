use crate::api::dto::ErrorBody;
use crate::utils::error::RankError;
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

// map domain errors to HTTP responses
impl IntoResponse for RankError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(code = self.code(), "❌ Request failed: {}", self);
        } else {
            tracing::debug!(
                code = self.code(),
                status = status.as_u16(),
                "Request rejected: {}",
                self
            );
        }

        let body = ErrorBody {
            error: self.to_string(),
            code: self.code().to_string(),
            retryable: self.is_retryable(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for RankError {
    fn from(rejection: JsonRejection) -> Self {
        RankError::ValidationError {
            message: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for RankError {
    fn from(rejection: PathRejection) -> Self {
        RankError::ValidationError {
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for RankError {
    fn from(rejection: QueryRejection) -> Self {
        RankError::ValidationError {
            message: rejection.body_text(),
        }
    }
}
