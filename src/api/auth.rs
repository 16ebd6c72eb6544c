//! Brokerage login
//!
//! - POST /auth/login - Log in to the trading terminal, creating the user on first success

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::Scalar;
use crate::error::AppError;
use crate::types::User;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub login: Option<Scalar>,
    pub password: Option<String>,
    pub server: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: User,
}

async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let login = request.login.map(Scalar::into_text).unwrap_or_default();
    let password = request.password.unwrap_or_default();
    let server = request.server.map(|s| s.trim().to_string()).unwrap_or_default();
    if login.is_empty() || password.is_empty() || server.is_empty() {
        return Err(AppError::InvalidInput(
            "Missing login, password, or server".to_string(),
        ));
    }

    let outcome = state.broker.login(&login, &password, &server).await?;
    if !outcome.success {
        warn!(
            "Login rejected for {}: {}",
            login,
            outcome.error.as_deref().unwrap_or("no reason given")
        );
        return Err(AppError::Unauthorized("Login failed".to_string()));
    }

    let user = match state.store.find_user_by_login(&login)? {
        Some(user) => user,
        None => state.store.create_user(&login, &server)?,
    };
    info!("User {} logged in", user.id);

    Ok(Json(LoginResponse {
        success: true,
        user,
    }))
}
