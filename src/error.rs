use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Auto-trade is already running")]
    AlreadyActive,

    #[error("Auto-trade is not running")]
    NotActive,

    #[error("Analysis already in progress, try again later")]
    Busy,

    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("External failure: {0}")]
    ExternalFailure(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_)
            | AppError::AlreadyActive
            | AppError::NotActive
            | AppError::UnknownStrategy(_) => StatusCode::BAD_REQUEST,
            AppError::Busy => StatusCode::CONFLICT,
            AppError::ExternalFailure(_) => StatusCode::BAD_GATEWAY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Internal(_)
            | AppError::Sqlite(_)
            | AppError::SerdeJson(_)
            | AppError::Anyhow(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Unexpected failures stay in the log, clients get a generic message
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Request failed: {}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "message": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_conflicts_are_client_errors() {
        assert_eq!(AppError::AlreadyActive.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NotActive.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::UnknownStrategy("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_busy_is_distinct_from_hard_errors() {
        assert_eq!(AppError::Busy.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::ExternalFailure("timeout".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_conflict_messages_match_http_contract() {
        assert_eq!(AppError::AlreadyActive.to_string(), "Auto-trade is already running");
        assert_eq!(AppError::NotActive.to_string(), "Auto-trade is not running");
    }

    #[tokio::test]
    async fn test_internal_error_body_is_generic() {
        let response = AppError::Internal("db exploded".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "Internal server error");
        assert_eq!(body["status"], 500);
    }
}
