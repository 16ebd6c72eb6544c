//! Trading API
//!
//! - POST /trading/start-auto-trade - Start the recurring auto-trade job
//! - POST /trading/stop-auto-trade - Stop it
//! - GET /trading/bot-status - Current status and analysis flag
//! - POST /trading/start-trade - Analyze one symbol now
//! - GET /trading/last-batch - Report of the most recent scheduled batch

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::{require, MessageResponse, Scalar};
use crate::error::AppError;
use crate::types::{BatchReport, BotStatusPayload, Decision};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/start-auto-trade", post(start_auto_trade))
        .route("/stop-auto-trade", post(stop_auto_trade))
        .route("/bot-status", get(bot_status))
        .route("/start-trade", post(start_trade))
        .route("/last-batch", get(last_batch))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartAutoTradeRequest {
    pub user_id: Option<String>,
    pub volume: Option<f64>,
    pub strategy: Option<String>,
    /// Minutes between ticks
    pub interval: Option<Scalar>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTradeRequest {
    pub user_id: Option<String>,
    pub symbol: Option<String>,
    pub volume: Option<f64>,
    pub strategy: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeSignalResponse {
    pub message: String,
    pub symbol: String,
    pub decision: Decision,
}

/// Whole minutes, written as `5`, `"5"` or `5.0`.
fn parse_interval(interval: Scalar) -> Result<u32, AppError> {
    let text = interval.into_text();
    text.parse::<u32>()
        .ok()
        .or_else(|| {
            text.parse::<f64>()
                .ok()
                .filter(|m| m.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(m))
                .map(|m| m as u32)
        })
        .ok_or_else(|| AppError::InvalidInput("Interval must be a whole number of minutes".to_string()))
}

async fn start_auto_trade(
    State(state): State<AppState>,
    Json(request): Json<StartAutoTradeRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let user_id = require(request.user_id, "User ID is required")?;
    let strategy = require(request.strategy, "Strategy is required")?;
    let volume = request
        .volume
        .ok_or_else(|| AppError::InvalidInput("Volume is required".to_string()))?;
    let interval = match request.interval {
        Some(interval) => parse_interval(interval)?,
        None => state.config.default_interval_minutes,
    };

    state.scheduler.start(&user_id, volume, &strategy, interval)?;
    Ok(Json(MessageResponse::new("Auto-trade started")))
}

async fn stop_auto_trade(State(state): State<AppState>) -> Result<Json<MessageResponse>, AppError> {
    state.scheduler.stop()?;
    Ok(Json(MessageResponse::new("Auto-trade stopped")))
}

async fn bot_status(State(state): State<AppState>) -> Json<BotStatusPayload> {
    Json(state.bot_state.snapshot().into())
}

async fn start_trade(
    State(state): State<AppState>,
    Json(request): Json<StartTradeRequest>,
) -> Result<Json<TradeSignalResponse>, AppError> {
    let user_id = require(request.user_id, "User ID is required")?;
    let symbol = require(request.symbol, "Invalid input parameters")?;
    let strategy = require(request.strategy, "Strategy is required")?;
    let volume = request
        .volume
        .ok_or_else(|| AppError::InvalidInput("Invalid input parameters".to_string()))?;

    let decision = state
        .on_demand
        .run_once(&user_id, &symbol, volume, &strategy)
        .await?;

    let message = match &decision {
        Decision::Buy | Decision::Sell => format!(
            "Signal to {} {}",
            decision.side().unwrap_or_default(),
            symbol
        ),
        Decision::Hold => "No action required based on market conditions".to_string(),
        Decision::Error(reason) => return Err(AppError::ExternalFailure(reason.clone())),
    };

    Ok(Json(TradeSignalResponse {
        message,
        symbol,
        decision,
    }))
}

async fn last_batch(State(state): State<AppState>) -> Result<Json<BatchReport>, AppError> {
    state
        .scheduler
        .last_report()
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No batch has run yet".to_string()))
}
