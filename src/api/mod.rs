pub mod auth;
pub mod broker;
pub mod feedback;
pub mod health;
pub mod settings;
pub mod symbols;
pub mod trades;
pub mod trading;

use crate::error::AppError;
use crate::AppState;
use axum::Router;
use serde::{Deserialize, Serialize};

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(broker::router())
        .merge(symbols::router())
        .merge(feedback::router())
        .merge(settings::router())
        .merge(trades::router())
        .nest("/trading", trading::router())
        .nest("/auth", auth::router())
}

/// Plain `{message}` response body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A JSON value the dashboard sends either as a number or as a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(serde_json::Number),
    Text(String),
}

impl Scalar {
    pub fn into_text(self) -> String {
        match self {
            Scalar::Number(n) => n.to_string(),
            Scalar::Text(s) => s.trim().to_string(),
        }
    }
}

/// Unwrap a required, non-blank string field.
pub(crate) fn require(value: Option<String>, message: &str) -> Result<String, AppError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::InvalidInput(message.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_rejects_blank() {
        assert_eq!(require(Some(" u1 ".into()), "x").unwrap(), "u1");
        assert!(require(Some("  ".into()), "x").is_err());
        assert!(require(None, "x").is_err());
    }

    #[test]
    fn test_scalar_accepts_number_or_text() {
        let n: Scalar = serde_json::from_str("51234").unwrap();
        assert_eq!(n.into_text(), "51234");
        let s: Scalar = serde_json::from_str("\" 15 \"").unwrap();
        assert_eq!(s.into_text(), "15");
    }
}
