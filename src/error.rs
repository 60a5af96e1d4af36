use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::keys::UsageKey;
use crate::security::token::TokenError;
use crate::store::StoreError;

/// Everything that can stop a validation request.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("authentication failed: {0}")]
    Unauthenticated(#[from] TokenError),

    #[error("user {username} does not have author access to {course}")]
    AccessDenied { username: String, course: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid value {value:?} for parameter {name}")]
    BadParameter { name: &'static str, value: String },

    #[error("malformed {field} timestamp {value:?} on {location}")]
    MalformedTimestamp {
        location: UsageKey,
        field: String,
        value: String,
    },

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ValidationError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::CourseNotFound(course) => Self::NotFound(course.to_string()),
            StoreError::BlockNotFound(location) => Self::NotFound(location.to_string()),
            e => Self::Store(e),
        }
    }
}

impl ValidationError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::AccessDenied { .. } => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadParameter { .. } => StatusCode::BAD_REQUEST,
            Self::MalformedTimestamp { .. } | Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthenticated(_) => "not_authenticated",
            Self::AccessDenied { .. } => "permission_denied",
            Self::NotFound(_) => "not_found",
            Self::BadParameter { .. } => "invalid_parameter",
            Self::MalformedTimestamp { .. } => "malformed_timestamp",
            Self::Store(_) => "store_error",
        }
    }
}

impl IntoResponse for ValidationError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{self}");
        } else {
            tracing::debug!("{self}");
        }

        let body = json!({
            "developer_message": self.to_string(),
            "error_code": self.error_code(),
        });
        (status, Json(body)).into_response()
    }
}
