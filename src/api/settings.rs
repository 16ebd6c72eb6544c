//! Per-user indicator periods used by every strategy run.
//!
//! - GET /strategy-settings?userId= - Stored periods, or the defaults
//! - POST /strategy-settings - Save periods for a user

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::require;
use super::symbols::UserQuery;
use crate::error::AppError;
use crate::types::IndicatorConfig;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/strategy-settings", get(get_settings).post(save_settings))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSettingsRequest {
    pub user_id: Option<String>,
    #[serde(flatten)]
    pub indicators: IndicatorConfig,
}

fn validate(config: &IndicatorConfig) -> Result<(), AppError> {
    let periods = [
        config.short_term_ma_period,
        config.long_term_ma_period,
        config.rsi_period,
        config.macd_short_period,
        config.macd_long_period,
        config.macd_signal_period,
    ];
    if periods.contains(&0) {
        return Err(AppError::InvalidInput("Periods must be positive".to_string()));
    }
    if config.short_term_ma_period >= config.long_term_ma_period
        || config.macd_short_period >= config.macd_long_period
    {
        return Err(AppError::InvalidInput(
            "Short periods must be below long periods".to_string(),
        ));
    }
    Ok(())
}

async fn get_settings(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<IndicatorConfig>, AppError> {
    let user_id = require(query.user_id, "User ID is required")?;
    let config = state.store.get_indicator_config(&user_id)?.unwrap_or_default();
    Ok(Json(config))
}

async fn save_settings(
    State(state): State<AppState>,
    Json(request): Json<SaveSettingsRequest>,
) -> Result<Json<IndicatorConfig>, AppError> {
    let user_id = require(request.user_id, "User ID is required")?;
    validate(&request.indicators)?;
    state.store.save_indicator_config(&user_id, &request.indicators)?;
    Ok(Json(request.indicators))
}
