use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use murmur_db::DbError;
use murmur_types::api::ErrorBody;

/// Every failure a handler can return. Each variant maps to exactly one
/// status code; the body is always `{ "error": <message> }`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or malformed input, self-follow.
    #[error("{0}")]
    Validation(String),

    /// Missing, invalid or expired credential, or its user is gone.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but not the owner.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Duplicate unique field or relation.
    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Store(DbError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Store(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Conflict(_) => ApiError::Conflict("Resource already exists".into()),
            DbError::MissingReference(_) => ApiError::NotFound("Referenced resource not found".into()),
            other => ApiError::Store(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Store(e) => {
                tracing::error!("Database error: {}", e);
                "Internal server error".to_string()
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn response_status(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn taxonomy_maps_to_status_codes() {
        assert_eq!(response_status(ApiError::validation("x")), StatusCode::BAD_REQUEST);
        assert_eq!(
            response_status(ApiError::Unauthorized("x".into())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(response_status(ApiError::Forbidden("x".into())), StatusCode::FORBIDDEN);
        assert_eq!(response_status(ApiError::not_found("x")), StatusCode::NOT_FOUND);
        assert_eq!(response_status(ApiError::Conflict("x".into())), StatusCode::CONFLICT);
        assert_eq!(
            response_status(ApiError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn store_errors_are_classified() {
        assert!(matches!(
            ApiError::from(DbError::Conflict("dup".into())),
            ApiError::Conflict(_)
        ));
        assert!(matches!(
            ApiError::from(DbError::MissingReference("fk".into())),
            ApiError::NotFound(_)
        ));
        assert_eq!(
            response_status(ApiError::from(DbError::Poisoned)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
