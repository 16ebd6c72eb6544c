//! Swing strategy: moving-average crossover confirmed by RSI and MACD.

use std::sync::Arc;

use super::{parse_signal, StrategyBridge, StrategyFuture, StrategyRequest};
use crate::services::BrokerBridge;

pub const SWING_SCRIPT: &str = "swing_trading.py";

pub struct SwingStrategy {
    broker: Arc<BrokerBridge>,
}

impl SwingStrategy {
    pub fn new(broker: Arc<BrokerBridge>) -> Self {
        Self { broker }
    }

    /// `symbol` followed by all six indicator periods.
    pub fn script_args(request: &StrategyRequest) -> Vec<String> {
        let mut args = vec![request.symbol.clone()];
        args.extend(request.indicators.as_args());
        args
    }
}

impl StrategyBridge for SwingStrategy {
    fn name(&self) -> &str {
        "swing"
    }

    fn evaluate<'a>(&'a self, request: &'a StrategyRequest) -> StrategyFuture<'a> {
        Box::pin(async move {
            let output = self
                .broker
                .run_strategy(SWING_SCRIPT, &Self::script_args(request))
                .await?;
            parse_signal(&output)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IndicatorConfig;

    #[test]
    fn test_script_args() {
        let request = StrategyRequest {
            user_id: "u1".to_string(),
            symbol: "EURUSD".to_string(),
            indicators: IndicatorConfig::default(),
        };
        assert_eq!(
            SwingStrategy::script_args(&request),
            vec!["EURUSD", "5", "20", "14", "12", "26", "9"]
        );
    }
}
