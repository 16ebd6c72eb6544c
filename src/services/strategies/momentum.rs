use std::sync::Arc;

use super::{parse_signal, StrategyBridge, StrategyFuture, StrategyRequest};
use crate::services::BrokerBridge;

pub const MOMENTUM_SCRIPT: &str = "momentum_strategy.py";

/// Momentum strategy: RSI strength with MACD direction.
pub struct MomentumStrategy {
    broker: Arc<BrokerBridge>,
}

impl MomentumStrategy {
    pub fn new(broker: Arc<BrokerBridge>) -> Self {
        Self { broker }
    }

    pub fn script_args(request: &StrategyRequest) -> Vec<String> {
        let ind = &request.indicators;
        vec![
            request.symbol.clone(),
            ind.rsi_period.to_string(),
            ind.macd_short_period.to_string(),
            ind.macd_long_period.to_string(),
            ind.macd_signal_period.to_string(),
        ]
    }
}

impl StrategyBridge for MomentumStrategy {
    fn name(&self) -> &str {
        "momentum"
    }

    fn evaluate<'a>(&'a self, request: &'a StrategyRequest) -> StrategyFuture<'a> {
        Box::pin(async move {
            let output = self
                .broker
                .run_strategy(MOMENTUM_SCRIPT, &Self::script_args(request))
                .await?;
            parse_signal(&output)
        })
    }
}
