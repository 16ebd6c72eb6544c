use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::error::AppError;
use crate::types::TradeRecord;
use crate::AppState;

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 1000;

pub fn router() -> Router<AppState> {
    Router::new().route("/trades/open", get(list_trades))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradesQuery {
    pub user_id: Option<String>,
    pub limit: Option<usize>,
}

/// GET /trades/open - Trades recorded by the order dispatcher, newest first.
async fn list_trades(
    State(state): State<AppState>,
    Query(query): Query<TradesQuery>,
) -> Result<Json<Vec<TradeRecord>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let user_id = query.user_id.as_deref().filter(|u| !u.is_empty());
    Ok(Json(state.store.list_trades(user_id, limit)?))
}
