//! Terminal trade management, passed through to the broker bridge.
//!
//! - GET /api/open_trades
//! - POST /api/close_trades
//! - GET /api/get_auto_trade_status
//! - POST /api/set_auto_trade_status
//! - POST /api/close_trades_in_profit
//! - POST /api/close_trades_in_loss

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;

use crate::error::AppError;
use crate::services::TradeManagerCommand;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/open_trades", get(open_trades))
        .route("/api/close_trades", post(close_trades))
        .route("/api/get_auto_trade_status", get(get_auto_trade_status))
        .route("/api/set_auto_trade_status", post(set_auto_trade_status))
        .route("/api/close_trades_in_profit", post(close_trades_in_profit))
        .route("/api/close_trades_in_loss", post(close_trades_in_loss))
}

#[derive(Debug, Deserialize)]
pub struct SetAutoTradeStatusRequest {
    pub status: Option<Value>,
}

async fn run(state: &AppState, command: TradeManagerCommand) -> Result<Json<Value>, AppError> {
    Ok(Json(state.broker.trade_manager(command).await?))
}

async fn open_trades(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    run(&state, TradeManagerCommand::GetOpenTrades).await
}

async fn close_trades(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    run(&state, TradeManagerCommand::CloseAllTrades).await
}

async fn get_auto_trade_status(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    run(&state, TradeManagerCommand::IsAutotradeActive).await
}

async fn set_auto_trade_status(
    State(state): State<AppState>,
    Json(request): Json<SetAutoTradeStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let enabled = request
        .status
        .as_ref()
        .and_then(Value::as_bool)
        .ok_or_else(|| AppError::InvalidInput("Invalid status value".to_string()))?;
    run(&state, TradeManagerCommand::SetAutotrade(enabled)).await
}

async fn close_trades_in_profit(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    run(&state, TradeManagerCommand::CloseTradesInProfit).await
}

async fn close_trades_in_loss(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    run(&state, TradeManagerCommand::CloseTradesInLoss).await
}
