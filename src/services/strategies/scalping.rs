use std::sync::Arc;

use super::{parse_signal, StrategyBridge, StrategyFuture, StrategyRequest};
use crate::services::BrokerBridge;

pub const SCALPING_SCRIPT: &str = "scalping_strategy.py";

/// Scalping strategy: fast moving averages with an RSI filter.
pub struct ScalpingStrategy {
    broker: Arc<BrokerBridge>,
}

impl ScalpingStrategy {
    pub fn new(broker: Arc<BrokerBridge>) -> Self {
        Self { broker }
    }

    pub fn script_args(request: &StrategyRequest) -> Vec<String> {
        let ind = &request.indicators;
        vec![
            request.symbol.clone(),
            ind.short_term_ma_period.to_string(),
            ind.long_term_ma_period.to_string(),
            ind.rsi_period.to_string(),
        ]
    }
}

impl StrategyBridge for ScalpingStrategy {
    fn name(&self) -> &str {
        "scalping"
    }

    fn evaluate<'a>(&'a self, request: &'a StrategyRequest) -> StrategyFuture<'a> {
        Box::pin(async move {
            let output = self
                .broker
                .run_strategy(SCALPING_SCRIPT, &Self::script_args(request))
                .await?;
            parse_signal(&output)
        })
    }
}
