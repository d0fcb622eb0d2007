use arcade_shared::ValidationError;
use arcade_store::StoreError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0}")]
    InvalidUsername(String),

    #[error("{0}")]
    InvalidScore(String),

    #[error("Invalid game mode: {0}")]
    InvalidMode(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Same score submitted recently. Please wait before submitting again.")]
    DuplicateSubmission,

    #[error("{0}")]
    NotFound(String),

    #[error("Too many requests")]
    RateLimited,

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ValidationError> for ServerError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::InvalidUsername(reason) => ServerError::InvalidUsername(reason),
            ValidationError::InvalidScore(reason) => ServerError::InvalidScore(reason),
            ValidationError::InvalidMode(mode) => ServerError::InvalidMode(mode),
        }
    }
}

impl ServerError {
    /// Stable machine-readable code returned alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            ServerError::InvalidUsername(_) => "USERNAME_INVALID",
            ServerError::InvalidScore(_) => "SCORE_INVALID",
            ServerError::InvalidMode(_) => "MODE_INVALID",
            ServerError::BadRequest(_) => "VALIDATION_ERROR",
            ServerError::DuplicateSubmission => "DUPLICATE_SUBMISSION",
            ServerError::NotFound(_) => "NOT_FOUND",
            ServerError::RateLimited => "RATE_LIMIT_EXCEEDED",
            ServerError::Storage(_) => "DATABASE_ERROR",
            ServerError::Internal(_) => "SERVER_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::InvalidUsername(_)
            | ServerError::InvalidScore(_)
            | ServerError::InvalidMode(_)
            | ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::DuplicateSubmission => StatusCode::CONFLICT,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ServerError::Storage(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let message = match &self {
            ServerError::Storage(e) => {
                tracing::error!(error = %e, "storage failure");
                "Database operation failed".to_string()
            }
            ServerError::Internal(e) => {
                tracing::error!(error = %e, "unhandled server error");
                "An unexpected error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = serde_json::json!({
            "error": {
                "code": self.code(),
                "message": message,
            }
        });

        (self.status(), axum::Json(body)).into_response()
    }
}
