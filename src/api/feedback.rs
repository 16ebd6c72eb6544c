use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use super::require;
use crate::error::AppError;
use crate::types::Feedback;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/feedback", post(submit_feedback))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub user_id: Option<String>,
    pub rating: Option<i64>,
    pub comment: Option<String>,
    pub symbol: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub message: &'static str,
    pub feedback: Feedback,
}

/// POST /feedback
async fn submit_feedback(
    State(state): State<AppState>,
    Json(request): Json<FeedbackRequest>,
) -> Result<Json<FeedbackResponse>, AppError> {
    let user_id = require(request.user_id, "User ID is required")?;
    let rating = request
        .rating
        .filter(|r| (1..=5).contains(r))
        .ok_or_else(|| AppError::InvalidInput("Rating must be between 1 and 5".to_string()))?;

    if state.store.get_user(&user_id)?.is_none() {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let feedback = state.store.create_feedback(
        &user_id,
        rating,
        request.comment.as_deref(),
        request.symbol.as_deref(),
    )?;

    Ok(Json(FeedbackResponse {
        message: "Feedback submitted successfully",
        feedback,
    }))
}
