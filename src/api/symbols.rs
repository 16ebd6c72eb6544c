//! Saved symbols API
//!
//! - GET /symbols?userId= - List a user's symbols in saved order
//! - POST /symbols - Replace a user's symbols
//! - DELETE /symbols - Remove one symbol

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::info;

use super::{require, MessageResponse};
use crate::error::AppError;
use crate::types::SymbolRecord;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/symbols",
        get(get_symbols).post(save_symbols).delete(delete_symbol),
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSymbolsRequest {
    pub user_id: Option<String>,
    pub symbols: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSymbolRequest {
    pub user_id: Option<String>,
    pub symbol: Option<String>,
}

async fn get_symbols(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<SymbolRecord>>, AppError> {
    let user_id = require(query.user_id, "User ID is required")?;
    Ok(Json(state.store.get_symbols(&user_id)?))
}

async fn save_symbols(
    State(state): State<AppState>,
    Json(request): Json<SaveSymbolsRequest>,
) -> Result<Json<Vec<SymbolRecord>>, AppError> {
    let user_id = require(request.user_id, "User ID is required")?;
    let symbols = request
        .symbols
        .ok_or_else(|| AppError::InvalidInput("Symbols must be an array".to_string()))?;

    let symbols: Vec<String> = symbols.iter().map(|s| s.trim().to_string()).collect();
    if symbols.iter().any(String::is_empty) {
        return Err(AppError::InvalidInput("Symbols must not be blank".to_string()));
    }

    let saved = state.store.replace_symbols(&user_id, &symbols)?;
    info!("Saved {} symbols for {}", saved.len(), user_id);
    Ok(Json(saved))
}

async fn delete_symbol(
    State(state): State<AppState>,
    Json(request): Json<DeleteSymbolRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let message = "User ID and symbol are required";
    let user_id = require(request.user_id, message)?;
    let symbol = require(request.symbol, message)?;

    state.store.delete_symbol(&user_id, &symbol)?;
    Ok(Json(MessageResponse::new("Symbol deleted successfully")))
}
