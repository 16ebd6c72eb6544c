//! On-demand analysis for a single symbol.
//!
//! Shares the analysis lock with the scheduler. A request that finds the lock
//! held fails with [`AppError::Busy`] straight away.

use std::sync::Arc;
use tracing::info;

use crate::error::AppError;
use crate::services::orders::{OrderDispatcher, OrderIntent};
use crate::services::scheduler::{schedule_config, TradingRepository};
use crate::services::{AnalysisExecutor, BotStateMachine};
use crate::types::Decision;

pub struct OnDemandRunner {
    state: Arc<BotStateMachine>,
    executor: Arc<AnalysisExecutor>,
    repository: Arc<dyn TradingRepository>,
    orders: Option<OrderDispatcher>,
}

impl OnDemandRunner {
    pub fn new(
        state: Arc<BotStateMachine>,
        executor: Arc<AnalysisExecutor>,
        repository: Arc<dyn TradingRepository>,
        orders: Option<OrderDispatcher>,
    ) -> Self {
        Self {
            state,
            executor,
            repository,
            orders,
        }
    }

    /// Evaluate `strategy_id` for one symbol now.
    ///
    /// Strategy failures come back as [`Decision::Error`].
    pub async fn run_once(
        &self,
        user_id: &str,
        symbol: &str,
        volume: f64,
        strategy_id: &str,
    ) -> Result<Decision, AppError> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(AppError::InvalidInput("Symbol is required".to_string()));
        }
        let params = schedule_config(user_id, volume, strategy_id, 0)?;

        let _guard = self.state.begin_analysis()?;

        let indicators = self.repository.indicator_config(&params.user_id).await?;
        let decision = self
            .executor
            .evaluate(&params.user_id, symbol, &params.strategy, &indicators)
            .await?;

        info!(
            "Manual {} run for {} ({}): {:?}",
            params.strategy, symbol, params.user_id, decision
        );

        if let Some(intent) = OrderIntent::from_decision(&params.user_id, symbol, volume, &decision) {
            match &self.orders {
                Some(orders) => {
                    orders.dispatch(intent);
                }
                None => info!("Order placement disabled, not sending {} {}", intent.side, symbol),
            }
        }

        Ok(decision)
    }
}
